//! Format checks for Kubernetes manifests.

use kube_validator_core::models::{Annotation, Severity};
use serde_yaml::{Mapping, Value};

/// Validates the contents of one manifest file.
pub trait ManifestValidator: Send + Sync {
    fn validate(&self, path: &str, contents: &[u8], strict: bool) -> Vec<Annotation>;
}

/// Top-level keys found on built-in Kubernetes objects.
const ENVELOPE_KEYS: &[&str] = &[
    "apiVersion",
    "kind",
    "metadata",
    "spec",
    "status",
    "data",
    "stringData",
    "binaryData",
    "type",
    "immutable",
    "items",
    "rules",
    "roleRef",
    "subjects",
    "aggregationRule",
    "webhooks",
    "secrets",
    "imagePullSecrets",
    "automountServiceAccountToken",
    "subsets",
    "provisioner",
    "parameters",
    "reclaimPolicy",
    "volumeBindingMode",
    "allowVolumeExpansion",
    "mountOptions",
    "allowedTopologies",
    "handler",
    "overhead",
    "scheduling",
    "value",
    "globalDefault",
    "description",
    "preemptionPolicy",
    "template",
    "target",
    "involvedObject",
    "reason",
    "message",
    "source",
    "firstTimestamp",
    "lastTimestamp",
    "count",
    "endpoints",
    "addressType",
    "ports",
];

/// Checks that every document is a well-formed Kubernetes object envelope.
///
/// Schema checks against a cluster version are out of its reach; this only
/// covers what can be decided from the manifest itself.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuralValidator;

impl ManifestValidator for StructuralValidator {
    fn validate(&self, path: &str, contents: &[u8], strict: bool) -> Vec<Annotation> {
        let text = match std::str::from_utf8(contents) {
            Ok(text) => text,
            Err(e) => return vec![Annotation::failure(path, format!("not valid UTF-8: {e}"))],
        };
        let lenient = if strict { Severity::Failure } else { Severity::Warning };
        let mut annotations = Vec::new();
        for document in split_documents(text) {
            check_document(path, &document, lenient, &mut annotations);
        }
        annotations
    }
}

/// A YAML document and the 1-based line it starts on.
#[derive(Debug, PartialEq, Eq)]
struct Document<'a> {
    first_line: u32,
    text: &'a str,
}

impl Document<'_> {
    fn is_blank(&self) -> bool {
        self.text.lines().all(|line| {
            let line = line.trim();
            line.is_empty() || line.starts_with('#')
        })
    }

    /// Absolute line of a top-level key, if it appears at column 0.
    fn key_line(&self, key: &str) -> Option<u32> {
        self.text
            .lines()
            .position(|line| {
                line.strip_prefix(key).is_some_and(|rest| rest.trim_start().starts_with(':'))
            })
            .map(|index| self.first_line + index as u32)
    }
}

/// For a `---` separator line, the part of it that starts the next document.
fn separator_content(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("---")?;
    let bare = rest.is_empty() || rest.starts_with([' ', '\t', '\r', '\n']);
    bare.then(|| rest.trim_start_matches([' ', '\t']))
}

fn split_documents(text: &str) -> Vec<Document<'_>> {
    let mut documents = Vec::new();
    let mut start = 0;
    let mut first_line = 1;
    let mut offset = 0;
    for (index, line) in text.split_inclusive('\n').enumerate() {
        if let Some(content) = separator_content(line) {
            documents.push(Document { first_line, text: &text[start..offset] });
            start = offset + line.len() - content.len();
            first_line = index as u32 + 1;
        }
        offset += line.len();
    }
    documents.push(Document { first_line, text: &text[start..] });
    documents.retain(|document| !document.is_blank());
    documents
}

fn check_document(
    path: &str,
    document: &Document,
    lenient: Severity,
    annotations: &mut Vec<Annotation>,
) {
    let at = |line: Option<u32>, severity: Severity, message: String| {
        let annotation = Annotation::new(path, severity, message);
        annotation.with_line(line.unwrap_or(document.first_line))
    };
    let value: Value = match serde_yaml::from_str(document.text) {
        Ok(value) => value,
        Err(e) => {
            let mut annotation = Annotation::failure(path, e.to_string()).with_title("YAML syntax");
            annotation = match e.location() {
                Some(location) => annotation
                    .with_line(document.first_line + location.line() as u32 - 1)
                    .with_column(location.column() as u32),
                None => annotation.with_line(document.first_line),
            };
            annotations.push(annotation);
            return;
        }
    };
    let Value::Mapping(object) = value else {
        annotations.push(at(
            None,
            Severity::Failure,
            "expected a Kubernetes object (a YAML mapping)".to_string(),
        ));
        return;
    };

    for key in ["apiVersion", "kind"] {
        match object.get(key) {
            Some(Value::String(value)) if !value.is_empty() => {}
            Some(_) => annotations.push(at(
                document.key_line(key),
                Severity::Failure,
                format!("{key} must be a non-empty string"),
            )),
            None => annotations.push(at(None, Severity::Failure, format!("missing {key}"))),
        }
    }

    match object.get("metadata") {
        Some(Value::Mapping(metadata)) => {
            if !has_string(metadata, "name") && !has_string(metadata, "generateName") {
                annotations.push(at(
                    document.key_line("metadata"),
                    lenient,
                    "metadata.name is missing".to_string(),
                ));
            }
        }
        Some(_) => annotations.push(at(
            document.key_line("metadata"),
            Severity::Failure,
            "metadata must be a mapping".to_string(),
        )),
        None => annotations.push(at(None, lenient, "missing metadata".to_string())),
    }

    for key in object.keys() {
        let Some(key) = key.as_str() else {
            annotations.push(at(None, Severity::Failure, "non-string top-level key".to_string()));
            continue;
        };
        if !ENVELOPE_KEYS.contains(&key) {
            annotations.push(at(
                document.key_line(key),
                lenient,
                format!("unknown top-level field {key:?}"),
            ));
        }
    }
}

fn has_string(mapping: &Mapping, key: &str) -> bool {
    matches!(mapping.get(key), Some(Value::String(value)) if !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validate(contents: &str, strict: bool) -> Vec<Annotation> {
        StructuralValidator.validate("deploy/app.yaml", contents.as_bytes(), strict)
    }

    #[test]
    fn test_split_documents() {
        let text = "# leading\n---\na: 1\n---\n\n--- # trailing\nb: 2\n";
        let documents = split_documents(text);
        assert_eq!(documents, vec![
            Document { first_line: 2, text: "\na: 1\n" },
            Document { first_line: 6, text: "# trailing\nb: 2\n" },
        ]);
        assert_eq!(documents[0].key_line("a"), Some(3));
        assert!(split_documents("").is_empty());
        assert_eq!(split_documents("---x: 1\n").len(), 1);
    }

    #[test]
    fn test_content_on_separator_line() {
        let text = "\
apiVersion: v1
kind: ConfigMap
metadata:
  name: a
--- apiVersion: v1
kind: Service
metadata:
  name: b
";
        assert_eq!(validate(text, true), vec![]);

        let annotations = validate("---\n--- kind: Pod\nmetadata:\n  name: a\n", false);
        assert_eq!(annotations.len(), 1);
        assert_eq!(annotations[0].message, "missing apiVersion");
        assert_eq!(annotations[0].start_line, Some(2));
    }

    #[test]
    fn test_valid_manifests() {
        let text = "\
apiVersion: v1
kind: ConfigMap
metadata:
  name: settings
data:
  key: value
---
apiVersion: apps/v1
kind: Deployment
metadata:
  generateName: web-
spec:
  replicas: 1
";
        assert_eq!(validate(text, true), vec![]);
    }

    #[test]
    fn test_syntax_error_line_is_absolute() {
        let text = "apiVersion: v1\nkind: Pod\nmetadata:\n  name: a\n---\nkind: [\n";
        let annotations = validate(text, false);
        assert_eq!(annotations.len(), 1);
        assert_eq!(annotations[0].severity, Severity::Failure);
        assert!(annotations[0].start_line.is_some_and(|line| line >= 6));
    }

    #[test]
    fn test_missing_envelope_fields() {
        let annotations = validate("metadata:\n  name: a\n", false);
        let messages = annotations.iter().map(|a| a.message.as_str()).collect::<Vec<_>>();
        assert_eq!(messages, vec!["missing apiVersion", "missing kind"]);
        assert!(annotations.iter().all(Annotation::is_failure));

        let annotations = validate("apiVersion: 3\nkind: Pod\nmetadata:\n  name: a\n", false);
        assert_eq!(annotations.len(), 1);
        assert_eq!(annotations[0].start_line, Some(1));

        let annotations = validate("- just\n- a list\n", false);
        assert_eq!(annotations.len(), 1);
        assert!(annotations[0].message.contains("Kubernetes object"));
    }

    #[test]
    fn test_strict_escalates_lenient_findings() {
        let text = "apiVersion: v1\nkind: Pod\nmetadata:\n  labels: {}\nspecs: {}\n";
        let lenient = validate(text, false);
        assert_eq!(lenient.len(), 2);
        assert!(lenient.iter().all(|a| a.severity == Severity::Warning));
        assert_eq!(lenient[0].start_line, Some(3));
        assert_eq!(lenient[1].message, "unknown top-level field \"specs\"");
        assert_eq!(lenient[1].start_line, Some(5));

        let strict = validate(text, true);
        assert_eq!(strict.len(), 2);
        assert!(strict.iter().all(Annotation::is_failure));
    }

    #[test]
    fn test_invalid_utf8() {
        let annotations = StructuralValidator.validate("a.yaml", &[0xff, 0xfe], false);
        assert_eq!(annotations.len(), 1);
        assert!(annotations[0].is_failure());
    }
}
