//! Static documentation record exposed to the host pipeline.

use serde::Serialize;

/// Summary of one configuration field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDoc {
    pub name: &'static str,
    pub summary: &'static str,
}

/// Human-readable description of the publish step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Documentation {
    pub description: &'static str,
    pub example: &'static str,
    /// Type name of the record produced by a push.
    pub output: &'static str,
    pub fields: Vec<FieldDoc>,
}

const EXAMPLE: &str = r#"
[build]
command = "zip -r build/server.zip ./"

[registry]
source = "server.zip"
name = "${env:GIT_REF}.zip"
bucket = "staging.gcp-project-name.appspot.com"
"#;

/// Documentation for the registry publish step.
pub fn registry_documentation() -> Documentation {
    Documentation {
        description: "Upload build artifacts to Google Cloud Storage",
        example: EXAMPLE,
        output: "gcs.Artifact",
        fields: vec![
            FieldDoc {
                name: "source",
                summary: "The build artifact to upload to GCS",
            },
            FieldDoc {
                name: "name",
                summary: "The name of the object to create on GCS",
            },
            FieldDoc {
                name: "bucket",
                summary: "The name of the GCS bucket",
            },
        ],
    }
}

impl Documentation {
    /// Look up the summary of a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDoc> {
        self.fields.iter().find(|f| f.name == name)
    }
}
