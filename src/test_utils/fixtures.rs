//! Test fixtures for Rally records, pages and environments
//!
//! Records are built as raw JSON the way the API returns them, so tests exercise
//! the same parsing path as production code. Everything defaults to the `DEV`
//! environment served from `https://dev.example.com/api/v2`.

use std::sync::Arc;

use serde_json::{Value, json};

use crate::config::{ApiConfig, GlobalConfig};
use crate::models::{Collection, Entity, Notification, Preset, Provider, Rule};
use crate::repository::EnvironmentCollections;

/// Environment fixtures are created in.
pub const ENV: &str = "DEV";

/// Configuration with one API section per name in `envs`.
///
/// Each environment is served from `https://<env lowercased>.example.com/api/v2` with
/// the key `<env>-key`.
#[must_use]
pub fn config(envs: &[&str]) -> GlobalConfig {
    let mut config = GlobalConfig::default();
    for env in envs {
        config.add_api(
            (*env).to_string(),
            ApiConfig {
                url: format!("https://{}.example.com/api/v2", env.to_lowercase()),
                key: format!("{env}-key"),
                restrict_uat: false,
            },
        );
    }
    config
}

/// Body of page `page` out of `pages` of `endpoint`, with absolute links under `base`.
#[must_use]
pub fn page_body(
    records: Vec<Value>,
    base: &str,
    endpoint: &str,
    page: u32,
    pages: u32,
    size: u32,
) -> String {
    let link = |n: u32| format!("{base}{endpoint}?page={n}p{size}");
    let next = if page < pages {
        Value::String(link(page + 1))
    } else {
        Value::Null
    };

    json!({
        "data": records,
        "links": {
            "self": link(page),
            "first": link(1),
            "last": link(pages),
            "next": next,
        }
    })
    .to_string()
}

/// Record with only an id and a name, e.g. a provider or a notification.
#[must_use]
pub fn named_record(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "type": "record",
        "attributes": {"name": name},
        "relationships": {},
        "links": {"self": format!("/records/{id}")}
    })
}

/// Preset record; an empty `provider_id` leaves the provider type unset.
#[must_use]
pub fn preset_record(id: &str, name: &str, provider_id: &str) -> Value {
    let provider = if provider_id.is_empty() {
        Value::Null
    } else {
        json!({"id": provider_id, "type": "providerTypes"})
    };
    json!({
        "id": id,
        "type": "presets",
        "attributes": {"name": name},
        "relationships": {
            "providerType": {"data": provider},
            "organization": {"data": {"id": "org-1", "type": "organizations"}}
        },
        "links": {"self": format!("/presets/{id}")}
    })
}

/// Builder for workflow rule records.
#[derive(Debug, Clone)]
pub struct RuleFixture {
    record: Value,
}

impl RuleFixture {
    /// Rule with no relationships set.
    #[must_use]
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            record: json!({
                "id": id,
                "type": "workflowRules",
                "attributes": {"name": name},
                "relationships": {
                    "organization": {"data": {"id": "org-1", "type": "organizations"}},
                    "passNext": {"data": null},
                    "errorNext": {"data": null}
                },
                "links": {"self": format!("/workflowRules/{id}")}
            }),
        }
    }

    fn single(mut self, field: &str, kind: &str, id: &str) -> Self {
        self.record["relationships"][field] = json!({
            "data": {"id": id, "type": kind},
            "links": {"self": format!("/relationships/{field}")}
        });
        self
    }

    fn list(mut self, field: &str, ids: &[&str]) -> Self {
        let data: Vec<Value> =
            ids.iter().map(|id| json!({"id": id, "type": "notificationPresets"})).collect();
        self.record["relationships"][field] = json!({"data": data});
        self
    }

    /// Bind a preset.
    #[must_use]
    pub fn preset(self, id: &str) -> Self {
        self.single("preset", "presets", id)
    }

    /// Set the provider type.
    #[must_use]
    pub fn provider(self, id: &str) -> Self {
        self.single("providerType", "providerTypes", id)
    }

    /// Set the next rule on pass.
    #[must_use]
    pub fn pass_next(self, id: &str) -> Self {
        self.single("passNext", "workflowRules", id)
    }

    /// Set the next rule on error.
    #[must_use]
    pub fn error_next(self, id: &str) -> Self {
        self.single("errorNext", "workflowRules", id)
    }

    /// Set the enter notifications.
    #[must_use]
    pub fn enter_notifications(self, ids: &[&str]) -> Self {
        self.list("enterNotifications", ids)
    }

    /// Set the pass notifications.
    #[must_use]
    pub fn pass_notifications(self, ids: &[&str]) -> Self {
        self.list("passNotifications", ids)
    }

    /// Set the error notifications.
    #[must_use]
    pub fn error_notifications(self, ids: &[&str]) -> Self {
        self.list("errorNotifications", ids)
    }

    /// The raw record.
    #[must_use]
    pub fn build(self) -> Value {
        self.record
    }
}

/// A `DEV` rule, optionally bound to a preset.
///
/// # Panics
///
/// Never in practice; fixture records always carry an id.
#[must_use]
pub fn rule(id: &str, name: &str, preset_id: Option<&str>) -> Rule {
    let fixture = RuleFixture::new(id, name);
    let fixture = match preset_id {
        Some(preset_id) => fixture.preset(preset_id),
        None => fixture,
    };
    Rule::from_value(fixture.build(), ENV).expect("fixture rule has an id")
}

/// A `DEV` preset, optionally with code already set.
///
/// # Panics
///
/// Never in practice; fixture records always carry an id.
#[must_use]
pub fn preset(id: &str, name: &str, code: Option<&str>) -> Preset {
    let preset = Preset::from_value(preset_record(id, name, ""), ENV).expect("fixture preset has an id");
    if let Some(code) = code {
        preset.set_code(code.to_string());
    }
    preset
}

fn collection<T: Entity>(records: Vec<Value>) -> Arc<Collection<T>> {
    Arc::new(Collection::from_entities(
        records.into_iter().map(|record| T::from_value(record, ENV).expect("fixture record has an id")),
    ))
}

/// `DEV` collections built from raw records.
///
/// # Panics
///
/// Panics if a record has no id.
#[must_use]
pub fn collections(
    rules: Vec<Value>,
    presets: Vec<Value>,
    providers: Vec<Value>,
    notifications: Vec<Value>,
) -> EnvironmentCollections {
    EnvironmentCollections {
        rules: collection::<Rule>(rules),
        presets: collection::<Preset>(presets),
        providers: collection::<Provider>(providers),
        notifications: collection::<Notification>(notifications),
    }
}
