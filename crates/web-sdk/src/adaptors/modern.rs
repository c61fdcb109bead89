//! Modern protocol adaptor: renders hits as calls to the global analytics
//! function (`send`, `set`, `require` and the ecommerce plugin commands).

use ga_bridge_core::{BridgeError, BridgeResult, Command, FieldMap, FieldValue, HitType, Settings};
use std::sync::Arc;
use tracing::debug;

use super::{CommandAdaptor, Protocol};
use crate::events::HitDescriptor;
use crate::host::UniversalFunction;

const BASIC_PLUGIN: &str = "ecommerce";
const ENHANCED_PLUGIN: &str = "ec";

pub struct ModernAdaptor {
    namespace: String,
    function: Arc<dyn UniversalFunction>,
}

impl ModernAdaptor {
    pub fn new(namespace: impl Into<String>, function: Arc<dyn UniversalFunction>) -> Self {
        Self {
            namespace: namespace.into(),
            function,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn send(hit_type: &str, fields: &FieldMap) -> Command {
        let mut fields = fields.clone();
        fields.insert("hitType".into(), hit_type.into());
        Command::new("send").arg(fields)
    }

    fn render(hit: &HitDescriptor, enhanced: bool) -> BridgeResult<Command> {
        let command = match hit.hit_type {
            HitType::Pageview => Self::send("pageview", &hit.fields),
            HitType::Event | HitType::Exception => Self::send("event", &hit.fields),
            HitType::Timing => Self::send("timing", &hit.fields),
            HitType::SetUserProperties => Command::new("set").arg(hit.fields.clone()),
            HitType::EcommerceRequire => {
                Command::new("require").arg(if enhanced { ENHANCED_PLUGIN } else { BASIC_PLUGIN })
            }
            HitType::EcommerceAddTransaction if enhanced => Command::new("ec:setAction")
                .arg("purchase")
                .arg(hit.fields.clone()),
            HitType::EcommerceAddTransaction => {
                Command::new("ecommerce:addTransaction").arg(hit.fields.clone())
            }
            HitType::EcommerceAddItem if enhanced => {
                let mut fields = hit.fields.clone();
                fields.remove("transactionId");
                Command::new("ec:addProduct").arg(fields)
            }
            HitType::EcommerceAddItem => {
                let mut fields = hit.fields.clone();
                let transaction_id = fields.remove("transactionId").unwrap_or_default();
                if let Some(sku) = fields.remove("id") {
                    fields.insert("sku".into(), sku);
                }
                fields.insert("id".into(), transaction_id);
                Command::new("ecommerce:addItem").arg(fields)
            }
            HitType::EcommerceSend if enhanced => {
                return Err(BridgeError::Unsupported(
                    "enhanced ecommerce data must be sent bundled with an event hit".into(),
                ))
            }
            HitType::EcommerceSend => Command::new("ecommerce:send"),
        };
        Ok(command)
    }
}

impl CommandAdaptor for ModernAdaptor {
    fn protocol(&self) -> Protocol {
        Protocol::Modern
    }

    fn translate(&self, hit: &HitDescriptor, settings: &Settings) -> BridgeResult<Vec<Command>> {
        let mut command = Self::render(hit, settings.enhanced_ecommerce)?;

        // require carries no field bag
        if hit.hit_type == HitType::EcommerceRequire {
            return Ok(vec![command]);
        }

        if let Some(fields) = command.fields_mut() {
            if let Some(ref user_id) = settings.user_id {
                fields.insert("userId".into(), FieldValue::from(user_id.as_str()));
            }
            if let Some(transport) = settings.transport {
                fields.insert("transport".into(), transport.as_str().into());
            }
        }

        debug!(
            hit_type = %hit.hit_type,
            command = %command.name,
            namespace = %self.namespace,
            "modern command translated"
        );

        Ok(vec![command])
    }

    fn dispatch(&self, command: Command) {
        self.function.call(command);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::host::RecordingFunction;
    use ga_bridge_core::Transport;

    fn adaptor() -> ModernAdaptor {
        ModernAdaptor::new("ga", Arc::new(RecordingFunction::default()))
    }

    fn fields(pairs: &[(&str, FieldValue)]) -> FieldMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_pageview_transform() {
        let hit = HitDescriptor::with_fields(
            HitType::Pageview,
            fields(&[("page", "/abc".into()), ("dimension1", "gold".into())]),
        );
        let commands = adaptor().translate(&hit, &Settings::default()).unwrap();
        assert_eq!(commands.len(), 1);

        let cmd = &commands[0];
        assert_eq!(cmd.name, "send");
        let bag = cmd.fields().unwrap();
        assert_eq!(bag["hitType"], FieldValue::from("pageview"));
        assert_eq!(bag["page"], FieldValue::from("/abc"));
        assert_eq!(bag["dimension1"], FieldValue::from("gold"));
        assert!(!bag.contains_key("userId"));
        assert!(!bag.contains_key("transport"));
    }

    #[test]
    fn test_exception_renders_as_event() {
        let hit = HitDescriptor::with_fields(
            HitType::Exception,
            fields(&[("eventCategory", "Exceptions".into())]),
        );
        let cmd = &adaptor().translate(&hit, &Settings::default()).unwrap()[0];
        assert_eq!(cmd.fields().unwrap()["hitType"], FieldValue::from("event"));
    }

    #[test]
    fn test_user_id_and_transport_injected() {
        let settings = Settings {
            user_id: Some("abc".into()),
            transport: Some(Transport::Beacon),
            ..Default::default()
        };
        let hit = HitDescriptor::with_fields(HitType::SetUserProperties, FieldMap::new());
        let cmd = &adaptor().translate(&hit, &settings).unwrap()[0];
        assert_eq!(cmd.name, "set");
        let bag = cmd.fields().unwrap();
        assert_eq!(bag["userId"], FieldValue::from("abc"));
        assert_eq!(bag["transport"], FieldValue::from("beacon"));
    }

    #[test]
    fn test_require_skips_injection() {
        let settings = Settings {
            user_id: Some("abc".into()),
            transport: Some(Transport::Xhr),
            enhanced_ecommerce: true,
            ..Default::default()
        };
        let hit = HitDescriptor::new(HitType::EcommerceRequire);
        let cmd = &adaptor().translate(&hit, &settings).unwrap()[0];
        assert_eq!(cmd, &Command::new("require").arg("ec"));
    }

    #[test]
    fn test_basic_add_item_swaps_ids() {
        let hit = HitDescriptor::with_fields(
            HitType::EcommerceAddItem,
            fields(&[
                ("transactionId", "T-1".into()),
                ("id", "12345".into()),
                ("name", "Shirt".into()),
            ]),
        );
        let cmd = &adaptor().translate(&hit, &Settings::default()).unwrap()[0];
        assert_eq!(cmd.name, "ecommerce:addItem");
        let bag = cmd.fields().unwrap();
        assert_eq!(bag["id"], FieldValue::from("T-1"));
        assert_eq!(bag["sku"], FieldValue::from("12345"));
        assert!(!bag.contains_key("transactionId"));
    }

    #[test]
    fn test_enhanced_add_product_keeps_own_id() {
        let settings = Settings {
            enhanced_ecommerce: true,
            ..Default::default()
        };
        let hit = HitDescriptor::with_fields(
            HitType::EcommerceAddItem,
            fields(&[("transactionId", "T-1".into()), ("id", "12345".into())]),
        );
        let cmd = &adaptor().translate(&hit, &settings).unwrap()[0];
        assert_eq!(cmd.name, "ec:addProduct");
        let bag = cmd.fields().unwrap();
        assert_eq!(bag["id"], FieldValue::from("12345"));
        assert!(!bag.contains_key("transactionId"));
        assert!(!bag.contains_key("sku"));
    }

    #[test]
    fn test_enhanced_set_action() {
        let settings = Settings {
            enhanced_ecommerce: true,
            ..Default::default()
        };
        let hit = HitDescriptor::with_fields(
            HitType::EcommerceAddTransaction,
            fields(&[("id", "T-1".into()), ("coupon", "SUMMER_SALE".into())]),
        );
        let cmd = &adaptor().translate(&hit, &settings).unwrap()[0];
        assert_eq!(cmd.name, "ec:setAction");
        assert_eq!(cmd.args[0], FieldValue::from("purchase"));
        assert_eq!(cmd.fields().unwrap()["coupon"], FieldValue::from("SUMMER_SALE"));
    }

    #[test]
    fn test_raw_enhanced_send_rejected() {
        let settings = Settings {
            enhanced_ecommerce: true,
            ..Default::default()
        };
        let hit = HitDescriptor::new(HitType::EcommerceSend);
        let err = adaptor().translate(&hit, &settings).unwrap_err();
        assert!(matches!(err, BridgeError::Unsupported(_)));
    }

    #[test]
    fn test_basic_send_has_no_field_bag() {
        let settings = Settings {
            user_id: Some("abc".into()),
            ..Default::default()
        };
        let hit = HitDescriptor::new(HitType::EcommerceSend);
        let cmd = &adaptor().translate(&hit, &settings).unwrap()[0];
        assert_eq!(cmd, &Command::new("ecommerce:send"));
    }
}
