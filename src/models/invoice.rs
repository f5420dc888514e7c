use serde::{Deserialize, Deserializer, Serialize};

fn deserialize_text_flexible<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TextOrNumber {
        Text(String),
        Int(i64),
        Float(f64),
        Null(()),
    }

    Ok(match TextOrNumber::deserialize(deserializer)? {
        TextOrNumber::Text(s) => s,
        TextOrNumber::Int(i) => i.to_string(),
        TextOrNumber::Float(f) => f.to_string(),
        TextOrNumber::Null(()) => String::new(),
    })
}

/// An invoice line as delivered by the invoicing platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    #[serde(deserialize_with = "deserialize_text_flexible")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_text_flexible")]
    pub value: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub series: String,
}

impl Invoice {
    pub fn new(id: &str, value: &str) -> Self {
        Self {
            id: id.to_string(),
            name: String::new(),
            value: value.to_string(),
            date: String::new(),
            series: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn value_accepts_strings_and_numbers() {
        let invoices: Vec<Invoice> = serde_json::from_value(json!([
            {"id": "A-1", "name": "Stay", "value": "120.50", "date": "2024-03-02", "series": "A"},
            {"id": 17, "value": 80},
            {"id": "A-3", "value": 19.99},
            {"id": "A-4", "value": null}
        ]))
        .unwrap();

        assert_eq!(invoices[0].value, "120.50");
        assert_eq!(invoices[1].id, "17");
        assert_eq!(invoices[1].value, "80");
        assert_eq!(invoices[2].value, "19.99");
        assert_eq!(invoices[3].value, "");
    }
}
