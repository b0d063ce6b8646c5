//! Message templates for outbreak warnings.

use crate::domain::RegionCluster;

/// Parameters of one outbreak warning. Channel adapters render it through the
/// templates below.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutbreakAlert {
    pub region: String,
    pub disease: String,
}

impl OutbreakAlert {
    pub fn new(region: impl Into<String>, disease: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            disease: disease.into(),
        }
    }

    pub fn email_subject(&self) -> String {
        format!("Disease Outbreak Alert in {}", self.region)
    }

    pub fn email_html(&self) -> String {
        format!(
            "<h2>Crop Disease Alert</h2>\
             <p>Several farmers near you have reported <strong>{disease}</strong> \
             in <strong>{region}</strong> over the last day.</p>\
             <p>Inspect your fields and consider preventive measures.</p>",
            disease = escape_html(&self.disease),
            region = escape_html(&self.region),
        )
    }

    pub fn sms_body(&self) -> String {
        format!(
            "Alert: crop disease '{}' reported in your area ({}). Take precautions.",
            self.disease, self.region
        )
    }
}

impl From<&RegionCluster> for OutbreakAlert {
    fn from(cluster: &RegionCluster) -> Self {
        Self::new(cluster.region.clone(), cluster.disease.clone())
    }
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
