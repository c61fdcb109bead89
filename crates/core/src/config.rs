use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use crate::error::BridgeResult;
use crate::types::HitType;

/// Tracking settings shared by every dispatch. Loaded from environment
/// variables with the prefix `GA_BRIDGE__` and an optional TOML file, then
/// mutated freely by the host through a [`SettingsStore`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub disable_page_tracking: bool,
    #[serde(default)]
    pub disable_event_tracking: bool,
    /// Extra named trackers that receive copies of selected hits.
    #[serde(default)]
    pub additional_account_names: Vec<String>,
    #[serde(default)]
    pub additional_account_hit_types: AccountHitTypes,
    /// Use the enhanced ecommerce plugin instead of the basic one.
    #[serde(default)]
    pub enhanced_ecommerce: bool,
    #[serde(default)]
    pub transport: Option<Transport>,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Beacon,
    Xhr,
    Image,
}

impl Transport {
    pub fn as_str(self) -> &'static str {
        match self {
            Transport::Beacon => "beacon",
            Transport::Xhr => "xhr",
            Transport::Image => "image",
        }
    }
}

/// Which hit types are copied to the additional accounts, plus whether the
/// user id travels with those copies.
///
/// Pageviews and events default to replicated, every other entry to not
/// replicated. The per-field defaults apply both when the whole table is
/// absent and when a configured table leaves an entry out, so naming one
/// toggle never switches the preset pageview/event replication off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountHitTypes {
    #[serde(default = "default_true")]
    pub pageview: bool,
    #[serde(default = "default_true")]
    pub event: bool,
    #[serde(default, alias = "error")]
    pub exception: bool,
    #[serde(default)]
    pub timing: bool,
    #[serde(default)]
    pub set_user_properties: bool,
    /// Covers require, addTransaction, addItem and send together.
    #[serde(default)]
    pub ecommerce: bool,
    #[serde(default)]
    pub user_id: bool,
}

fn default_true() -> bool {
    true
}

impl Default for AccountHitTypes {
    fn default() -> Self {
        Self {
            pageview: default_true(),
            event: default_true(),
            exception: false,
            timing: false,
            set_user_properties: false,
            ecommerce: false,
            user_id: false,
        }
    }
}

impl AccountHitTypes {
    pub fn replicates(&self, hit_type: HitType) -> bool {
        match hit_type {
            HitType::Pageview => self.pageview,
            HitType::Event => self.event,
            HitType::Exception => self.exception,
            HitType::Timing => self.timing,
            HitType::SetUserProperties => self.set_user_properties,
            HitType::EcommerceRequire
            | HitType::EcommerceAddTransaction
            | HitType::EcommerceAddItem
            | HitType::EcommerceSend => self.ecommerce,
        }
    }
}

impl Settings {
    /// Load settings from environment variables and an optional config file.
    pub fn load(path: Option<&Path>) -> BridgeResult<Self> {
        Self::load_from(path, None)
    }

    /// As [`Settings::load`], reading `env` instead of the process
    /// environment when given.
    fn load_from(
        path: Option<&Path>,
        env: Option<config::Map<String, String>>,
    ) -> BridgeResult<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let builder = builder.add_source(
            config::Environment::with_prefix("GA_BRIDGE")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("additional_account_names")
                .source(env),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// These settings with `patch` merged over them. Objects merge key by
    /// key; any other value replaces the current one.
    pub fn merged(&self, patch: serde_json::Value) -> BridgeResult<Self> {
        let mut current = serde_json::to_value(self)?;
        merge_json(&mut current, patch);
        Ok(serde_json::from_value(current)?)
    }
}

fn merge_json(base: &mut serde_json::Value, patch: serde_json::Value) {
    use serde_json::Value;
    match (base, patch) {
        (Value::Object(base), Value::Object(patch)) => {
            for (key, value) in patch {
                merge_json(base.entry(key).or_insert(Value::Null), value);
            }
        }
        (base, patch) => *base = patch,
    }
}

/// Shared, host-mutable handle to the live [`Settings`].
///
/// Clones share the same underlying value. Readers always see the latest
/// write; no lock is held past the call that takes it.
#[derive(Debug, Clone, Default)]
pub struct SettingsStore {
    inner: Arc<RwLock<Settings>>,
}

impl SettingsStore {
    pub fn new(settings: Settings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings)),
        }
    }

    /// Copy of the current settings.
    pub fn current(&self) -> Settings {
        self.inner.read().clone()
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut Settings) -> R) -> R {
        f(&mut self.inner.write())
    }

    pub fn set_user_id(&self, user_id: impl Into<String>) {
        self.inner.write().user_id = Some(user_id.into());
    }
}
