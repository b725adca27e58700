//! SOAP 1.1 style request/response envelopes.
//!
//! Outbound envelopes are rendered by string building with every parameter
//! value escaped. Inbound envelopes are parsed with `quick-xml` into a small
//! namespace-resolved tree, so well-formedness is checked before any element
//! lookup happens.

use crate::domain::model::RemoteEnvelope;
use crate::utils::error::{LoanError, Result};
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;

pub const SOAP_ENV_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
pub const DEFAULT_SERVICE_NS: &str = "spyne.examples.hello";
pub const RESPONSE_ELEMENT: &str = "string";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeCodec {
    namespace: String,
}

impl Default for EnvelopeCodec {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE_NS)
    }
}

impl EnvelopeCodec {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Renders a request envelope with one child element per parameter, in order.
    pub fn encode(&self, operation_name: &str, parameters: &[(&str, String)]) -> String {
        let mut out = String::with_capacity(256);
        out.push_str("<soapenv:Envelope xmlns:soapenv=\"");
        out.push_str(SOAP_ENV_NS);
        out.push_str("\" xmlns:spy=\"");
        out.push_str(&escape(self.namespace.as_str()));
        out.push_str("\">");
        out.push_str("<soapenv:Header/><soapenv:Body>");
        out.push_str(&format!("<spy:{}>", operation_name));
        for (name, value) in parameters {
            out.push_str(&format!(
                "<spy:{name}>{}</spy:{name}>",
                escape(value.as_str()),
                name = name
            ));
        }
        out.push_str(&format!("</spy:{}>", operation_name));
        out.push_str("</soapenv:Body></soapenv:Envelope>");
        out
    }

    /// Extracts the text of the namespace-qualified result element.
    pub fn decode(&self, envelope: &str) -> Result<String> {
        let root = parse_document(envelope)?;
        root.find(Some(self.namespace.as_str()), RESPONSE_ELEMENT)
            .map(|node| node.text.clone())
            .ok_or_else(|| LoanError::ResponseElementMissing {
                element: format!("{{{}}}{}", self.namespace, RESPONSE_ELEMENT),
            })
    }

    /// Server side: reads the operation element and its parameters.
    pub fn decode_request(&self, envelope: &str) -> Result<RemoteEnvelope> {
        let root = parse_document(envelope)?;
        if root.local_name != "Envelope" || root.namespace.as_deref() != Some(SOAP_ENV_NS) {
            return Err(malformed("root element is not a SOAP Envelope"));
        }

        let body = root
            .children
            .iter()
            .find(|child| child.is(Some(SOAP_ENV_NS), "Body"))
            .ok_or_else(|| malformed("envelope has no Body"))?;

        let operation = body
            .children
            .first()
            .ok_or_else(|| malformed("Body has no operation element"))?;

        Ok(RemoteEnvelope {
            operation_name: operation.local_name.clone(),
            parameters: operation
                .children
                .iter()
                .map(|param| (param.local_name.clone(), param.text.clone()))
                .collect(),
            raw_body: envelope.to_string(),
        })
    }

    pub fn encode_response(&self, operation_name: &str, result: &str) -> String {
        format!(
            "<?xml version='1.0' encoding='UTF-8'?>\
             <soap11env:Envelope xmlns:soap11env=\"{env}\" xmlns:tns=\"{ns}\">\
             <soap11env:Body><tns:{op}Response><tns:{op}Result>\
             <tns:{el}>{result}</tns:{el}>\
             </tns:{op}Result></tns:{op}Response></soap11env:Body></soap11env:Envelope>",
            env = SOAP_ENV_NS,
            ns = escape(self.namespace.as_str()),
            op = operation_name,
            el = RESPONSE_ELEMENT,
            result = escape(result),
        )
    }

    pub fn encode_fault(&self, code: &str, message: &str) -> String {
        format!(
            "<?xml version='1.0' encoding='UTF-8'?>\
             <soap11env:Envelope xmlns:soap11env=\"{env}\">\
             <soap11env:Body><soap11env:Fault>\
             <faultcode>soap11env:{code}</faultcode>\
             <faultstring>{message}</faultstring>\
             <faultactor></faultactor>\
             </soap11env:Fault></soap11env:Body></soap11env:Envelope>",
            env = SOAP_ENV_NS,
            code = escape(code),
            message = escape(message),
        )
    }
}

/// Returns the `faultstring` of a SOAP fault, if the body is one.
pub fn fault_message(envelope: &str) -> Option<String> {
    let root = parse_document(envelope).ok()?;
    let fault = root.find(Some(SOAP_ENV_NS), "Fault")?;
    fault
        .children
        .iter()
        .find(|child| child.local_name == "faultstring")
        .map(|child| child.text.clone())
}

#[derive(Debug, Clone)]
struct XmlNode {
    namespace: Option<String>,
    local_name: String,
    text: String,
    children: Vec<XmlNode>,
}

impl XmlNode {
    fn is(&self, namespace: Option<&str>, local_name: &str) -> bool {
        self.local_name == local_name && self.namespace.as_deref() == namespace
    }

    /// Depth-first, document order.
    fn find(&self, namespace: Option<&str>, local_name: &str) -> Option<&XmlNode> {
        if self.is(namespace, local_name) {
            return Some(self);
        }
        self.children
            .iter()
            .find_map(|child| child.find(namespace, local_name))
    }
}

fn malformed(reason: impl Into<String>) -> LoanError {
    LoanError::MalformedEnvelope {
        reason: reason.into(),
    }
}

fn resolve_namespace(resolved: &ResolveResult<'_>) -> Result<Option<String>> {
    match resolved {
        ResolveResult::Bound(Namespace(ns)) => Ok(Some(String::from_utf8_lossy(ns).into_owned())),
        ResolveResult::Unbound => Ok(None),
        ResolveResult::Unknown(prefix) => Err(malformed(format!(
            "unbound namespace prefix '{}'",
            String::from_utf8_lossy(prefix)
        ))),
    }
}

fn attach(stack: &mut [XmlNode], root: &mut Option<XmlNode>, node: XmlNode) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None if root.is_none() => *root = Some(node),
        None => return Err(malformed("more than one root element")),
    }
    Ok(())
}

fn push_text(stack: &mut [XmlNode], text: &str) -> Result<()> {
    match stack.last_mut() {
        Some(node) => node.text.push_str(text),
        None if text.trim().is_empty() => {}
        None => return Err(malformed("text outside the root element")),
    }
    Ok(())
}

fn parse_document(xml: &str) -> Result<XmlNode> {
    let mut reader = NsReader::from_str(xml);
    let mut stack: Vec<XmlNode> = Vec::new();
    let mut root: Option<XmlNode> = None;

    loop {
        let (resolved, event) = reader
            .read_resolved_event()
            .map_err(|e| malformed(e.to_string()))?;

        match event {
            Event::Start(e) => {
                if root.is_some() && stack.is_empty() {
                    return Err(malformed("more than one root element"));
                }
                stack.push(XmlNode {
                    namespace: resolve_namespace(&resolved)?,
                    local_name: String::from_utf8_lossy(e.local_name().as_ref()).into_owned(),
                    text: String::new(),
                    children: Vec::new(),
                });
            }
            Event::Empty(e) => {
                let node = XmlNode {
                    namespace: resolve_namespace(&resolved)?,
                    local_name: String::from_utf8_lossy(e.local_name().as_ref()).into_owned(),
                    text: String::new(),
                    children: Vec::new(),
                };
                attach(&mut stack, &mut root, node)?;
            }
            Event::End(_) => {
                let node = stack
                    .pop()
                    .ok_or_else(|| malformed("unexpected closing tag"))?;
                attach(&mut stack, &mut root, node)?;
            }
            Event::Text(e) => {
                let text = e.unescape().map_err(|err| malformed(err.to_string()))?;
                push_text(&mut stack, &text)?;
            }
            Event::CData(e) => {
                let text = String::from_utf8_lossy(&e).into_owned();
                push_text(&mut stack, &text)?;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(malformed(format!("unclosed element <{}>", open.local_name)));
    }
    root.ok_or_else(|| malformed("document has no root element"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spyne_response(payload: &str) -> String {
        format!(
            "<?xml version='1.0' encoding='UTF-8'?>\n\
             <soap11env:Envelope xmlns:soap11env=\"http://schemas.xmlsoap.org/soap/envelope/\" \
             xmlns:tns=\"spyne.examples.hello\">\n  <soap11env:Body>\n    \
             <tns:etudier_solvabiliteResponse>\n      <tns:etudier_solvabiliteResult>\n        \
             <tns:string>{}</tns:string>\n      </tns:etudier_solvabiliteResult>\n    \
             </tns:etudier_solvabiliteResponse>\n  </soap11env:Body>\n</soap11env:Envelope>",
            payload
        )
    }

    #[test]
    fn test_encode_is_deterministic_and_ordered() {
        let codec = EnvelopeCodec::default();
        let params = [
            ("ville", "Bordeaux".to_string()),
            ("taille_logement", "100".to_string()),
            ("adresse", "1 rue X, Bordeaux".to_string()),
        ];
        let first = codec.encode("evaluer_propriete", &params);
        let second = codec.encode("evaluer_propriete", &params);
        assert_eq!(first, second);

        let ville = first.find("<spy:ville>").unwrap();
        let taille = first.find("<spy:taille_logement>").unwrap();
        let adresse = first.find("<spy:adresse>").unwrap();
        assert!(ville < taille && taille < adresse);
        assert!(first.contains("<spy:evaluer_propriete>"));
    }

    #[test]
    fn test_encode_escapes_reserved_characters() {
        let codec = EnvelopeCodec::default();
        let envelope = codec.encode("extraire_information", &[("demande", "a < b & c > \"d\"".to_string())]);
        assert!(envelope.contains("a &lt; b &amp; c &gt; &quot;d&quot;"));
        assert!(!envelope.contains("a < b"));
    }

    #[test]
    fn test_request_round_trip_preserves_values() {
        let codec = EnvelopeCodec::default();
        let letter = "Dear bank,\n  I am <client-002> & I want a loan for 'my' \"flat\".  ";
        let envelope = codec.encode(
            "extraire_information",
            &[("demande", letter.to_string()), ("extra", String::new())],
        );

        let request = codec.decode_request(&envelope).unwrap();
        assert_eq!(request.operation_name, "extraire_information");
        assert_eq!(request.parameter("demande"), Some(letter));
        assert_eq!(request.parameter("extra"), Some(""));
        assert_eq!(request.raw_body, envelope);
    }

    #[test]
    fn test_decode_spyne_response() {
        let codec = EnvelopeCodec::default();
        let text = codec
            .decode(&spyne_response("{'financial_cap': 500, 'score': 60}"))
            .unwrap();
        assert_eq!(text, "{'financial_cap': 500, 'score': 60}");
    }

    #[test]
    fn test_decode_unescapes_json_payload() {
        let codec = EnvelopeCodec::default();
        let text = codec
            .decode(&spyne_response("{&quot;customerId&quot;: &quot;client-002&quot;}"))
            .unwrap();
        assert_eq!(text, "{\"customerId\": \"client-002\"}");
    }

    #[test]
    fn test_response_round_trip() {
        let codec = EnvelopeCodec::default();
        let payload = "{'valeur': 20000, 'litiges': False} <&>";
        let envelope = codec.encode_response("evaluer_propriete", payload);
        assert_eq!(codec.decode(&envelope).unwrap(), payload);
    }

    #[test]
    fn test_decode_requires_namespace_match() {
        let codec = EnvelopeCodec::new("urn:other");
        let err = codec
            .decode(&spyne_response("{'score': 60}"))
            .unwrap_err();
        assert!(matches!(err, LoanError::ResponseElementMissing { .. }));
    }

    #[test]
    fn test_decode_missing_element() {
        let codec = EnvelopeCodec::default();
        let envelope = "<soap11env:Envelope xmlns:soap11env=\"http://schemas.xmlsoap.org/soap/envelope/\">\
                        <soap11env:Body/></soap11env:Envelope>";
        assert!(matches!(
            codec.decode(envelope),
            Err(LoanError::ResponseElementMissing { .. })
        ));
    }

    #[test]
    fn test_decode_malformed_input() {
        let codec = EnvelopeCodec::default();
        for input in [
            "",
            "not xml at all",
            "<a><b></a>",
            "<a><b>",
            "<a/><b/>",
            "<tns:string>x</tns:string>",
        ] {
            assert!(
                matches!(codec.decode(input), Err(LoanError::MalformedEnvelope { .. })),
                "expected malformed for {:?}",
                input
            );
        }
    }

    #[test]
    fn test_decode_request_rejects_non_envelope() {
        let codec = EnvelopeCodec::default();
        assert!(codec.decode_request("<root/>").is_err());
        let no_operation = format!(
            "<e:Envelope xmlns:e=\"{}\"><e:Body></e:Body></e:Envelope>",
            SOAP_ENV_NS
        );
        assert!(matches!(
            codec.decode_request(&no_operation),
            Err(LoanError::MalformedEnvelope { .. })
        ));
    }

    #[test]
    fn test_fault_message() {
        let codec = EnvelopeCodec::default();
        let fault = codec.encode_fault("Client", "unknown operation <x>");
        assert_eq!(fault_message(&fault).as_deref(), Some("unknown operation <x>"));
        assert!(fault_message(&spyne_response("ok")).is_none());
        assert!(matches!(
            codec.decode(&fault),
            Err(LoanError::ResponseElementMissing { .. })
        ));
    }
}
