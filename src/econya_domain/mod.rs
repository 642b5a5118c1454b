use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Deal {
    #[serde(rename = "id")]
    pub id: String,
    #[serde(rename = "label", default)]
    pub label: String,
    #[serde(rename = "partner", default)]
    pub partner: String,
    #[serde(rename = "link", default)]
    pub link: Option<String>,
    #[serde(rename = "saving", default, deserialize_with = "lenient_saving")]
    pub saving: f64,
    #[serde(rename = "category", default)]
    pub category: String,
    #[serde(rename = "country", default)]
    pub country: String,
}

impl Deal {
    /// The outbound link, unless it is absent or the `"#"` placeholder.
    pub fn outbound_link(&self) -> Option<&str> {
        match self.link.as_deref() {
            None | Some("") | Some("#") => None,
            Some(link) => Some(link),
        }
    }
}

// Catalog files are hand-edited; a `saving` of "120" or `null` must not
// poison the whole document.
fn lenient_saving<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let saving = match value {
        serde_json::Value::Number(number) => number.as_f64().unwrap_or(0.0),
        serde_json::Value::String(raw) => raw.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    };

    Ok(saving.max(0.0))
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Catalog {
    #[serde(rename = "deals", default)]
    pub deals: Vec<Deal>,
}

impl Catalog {
    pub fn find(&self, id: &str) -> Option<&Deal> {
        self.deals.iter().find(|deal| deal.id == id)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Ledger {
    #[serde(rename = "clicks", default)]
    pub clicks: BTreeMap<String, u64>,
    #[serde(rename = "saved_estimate_eur", default)]
    pub saved_estimate_eur: f64,
    #[serde(rename = "lastUpdate", default)]
    pub last_update: Option<DateTime<Utc>>,
}

impl Ledger {
    /// One successful redirect: bump the click counter, grow the running
    /// savings estimate (never below zero), stamp the update time.
    pub fn record_click(&mut self, deal_id: &str, saving: f64) {
        *self.clicks.entry(deal_id.to_owned()).or_insert(0) += 1;
        self.saved_estimate_eur = (self.saved_estimate_eur + saving).max(0.0);
        self.last_update = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saving_accepts_numbers_and_numeric_strings() {
        let deal: Deal = serde_json::from_str(r#"{"id":"a","saving":120}"#).unwrap();
        assert_eq!(deal.saving, 120.0);

        let deal: Deal = serde_json::from_str(r#"{"id":"a","saving":" 96.5 "}"#).unwrap();
        assert_eq!(deal.saving, 96.5);
    }

    #[test]
    fn saving_degrades_to_zero() {
        for raw in [
            r#"{"id":"a","saving":"beaucoup"}"#,
            r#"{"id":"a","saving":null}"#,
            r#"{"id":"a","saving":true}"#,
            r#"{"id":"a"}"#,
            r#"{"id":"a","saving":-40}"#,
        ] {
            let deal: Deal = serde_json::from_str(raw).unwrap();
            assert_eq!(deal.saving, 0.0, "for {raw}");
        }
    }

    #[test]
    fn outbound_link_rejects_placeholders() {
        let mut deal: Deal = serde_json::from_str(r#"{"id":"a","link":"https://x.fr"}"#).unwrap();
        assert_eq!(deal.outbound_link(), Some("https://x.fr"));

        deal.link = Some("#".into());
        assert_eq!(deal.outbound_link(), None);
        deal.link = Some("".into());
        assert_eq!(deal.outbound_link(), None);
        deal.link = None;
        assert_eq!(deal.outbound_link(), None);
    }

    #[test]
    fn catalog_lookup_is_exact_match() {
        let catalog: Catalog = serde_json::from_str(
            r#"{"deals":[{"id":"energy-eco"},{"id":"mobile-5g"}]}"#,
        )
        .unwrap();

        assert!(catalog.find("mobile-5g").is_some());
        assert!(catalog.find("mobile").is_none());
        assert!(catalog.find("MOBILE-5G").is_none());
    }

    #[test]
    fn record_click_increments_and_stamps() {
        let mut ledger = Ledger::default();
        ledger.record_click("energy-eco", 120.0);
        ledger.record_click("energy-eco", 120.0);
        ledger.record_click("mobile-5g", 0.0);

        assert_eq!(ledger.clicks.get("energy-eco"), Some(&2));
        assert_eq!(ledger.clicks.get("mobile-5g"), Some(&1));
        assert_eq!(ledger.saved_estimate_eur, 240.0);
        assert!(ledger.last_update.is_some());
    }

    #[test]
    fn savings_total_never_goes_negative() {
        let mut ledger = Ledger {
            saved_estimate_eur: -5.0,
            ..Ledger::default()
        };
        ledger.record_click("a", 2.0);
        assert_eq!(ledger.saved_estimate_eur, 0.0);
    }

    #[test]
    fn ledger_tolerates_sparse_documents() {
        let ledger: Ledger = serde_json::from_str("{}").unwrap();
        assert!(ledger.clicks.is_empty());
        assert_eq!(ledger.saved_estimate_eur, 0.0);
        assert!(ledger.last_update.is_none());

        let ledger: Ledger =
            serde_json::from_str(r#"{"clicks":{"a":3},"saved_estimate_eur":12.5,"lastUpdate":null}"#)
                .unwrap();
        assert_eq!(ledger.clicks.get("a"), Some(&3));
        assert!(ledger.last_update.is_none());
    }
}
