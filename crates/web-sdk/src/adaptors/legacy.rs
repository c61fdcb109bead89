//! Legacy protocol adaptor: renders hits as positional entries for the
//! global command queue (`_trackPageview`, `_trackEvent`, `_addTrans`, ...).
//!
//! The legacy protocol has no field bags, so custom dimensions, user id and
//! transport never reach it.

use ga_bridge_core::{BridgeError, BridgeResult, Command, HitType, Settings};
use std::sync::Arc;
use tracing::debug;

use super::{CommandAdaptor, Protocol};
use crate::events::HitDescriptor;
use crate::host::CommandQueue;

pub struct LegacyAdaptor {
    queue: Arc<dyn CommandQueue>,
}

impl LegacyAdaptor {
    pub fn new(queue: Arc<dyn CommandQueue>) -> Self {
        Self { queue }
    }

    fn positional(name: &str, hit: &HitDescriptor, keys: &[&str]) -> Command {
        keys.iter()
            .fold(Command::new(name), |cmd, key| cmd.arg(hit.positional(key)))
    }
}

impl CommandAdaptor for LegacyAdaptor {
    fn protocol(&self) -> Protocol {
        Protocol::Legacy
    }

    fn translate(&self, hit: &HitDescriptor, _settings: &Settings) -> BridgeResult<Vec<Command>> {
        let commands = match hit.hit_type {
            HitType::Pageview => vec![Self::positional("_trackPageview", hit, &["page"])],
            HitType::Event | HitType::Exception => vec![Self::positional(
                "_trackEvent",
                hit,
                &[
                    "eventCategory",
                    "eventAction",
                    "eventLabel",
                    "eventValue",
                    "nonInteraction",
                ],
            )],
            HitType::Timing => vec![Self::positional(
                "_trackTiming",
                hit,
                &[
                    "timingCategory",
                    "timingVar",
                    "timingValue",
                    "timingLabel",
                    "optSampleRate",
                ],
            )],
            HitType::SetUserProperties => {
                return Err(BridgeError::Unsupported(
                    "the legacy protocol has no \"set\" command or custom dimensions; hit ignored"
                        .into(),
                ))
            }
            HitType::EcommerceRequire => {
                debug!("legacy protocol needs no ecommerce require step");
                Vec::new()
            }
            HitType::EcommerceAddTransaction => vec![Self::positional(
                "_addTrans",
                hit,
                &[
                    "id",
                    "affiliation",
                    "revenue",
                    "tax",
                    "shipping",
                    "billingCity",
                    "billingRegion",
                    "billingCountry",
                ],
            )],
            HitType::EcommerceAddItem => vec![Self::positional(
                "_addItem",
                hit,
                &["transactionId", "id", "name", "category", "price", "quantity"],
            )],
            HitType::EcommerceSend => {
                let mut commands = Vec::with_capacity(2);
                if let Some(currency) = hit.get("currencyCode") {
                    commands.push(
                        Command::new("_set")
                            .arg("currencyCode")
                            .arg(currency.clone()),
                    );
                }
                commands.push(Command::new("_trackTrans"));
                commands
            }
        };

        debug!(
            hit_type = %hit.hit_type,
            commands = commands.len(),
            "legacy commands translated"
        );

        Ok(commands)
    }

    fn dispatch(&self, command: Command) {
        self.queue.push(command.to_positional());
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::host::RecordingQueue;
    use ga_bridge_core::{FieldMap, FieldValue, Transport};

    fn adaptor() -> LegacyAdaptor {
        LegacyAdaptor::new(Arc::new(RecordingQueue::default()))
    }

    fn hit(hit_type: HitType, pairs: &[(&str, FieldValue)]) -> HitDescriptor {
        HitDescriptor::with_fields(
            hit_type,
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect::<FieldMap>(),
        )
    }

    #[test]
    fn test_pageview() {
        let commands = adaptor()
            .translate(
                &hit(HitType::Pageview, &[("page", "/abc".into())]),
                &Settings::default(),
            )
            .unwrap();
        assert_eq!(
            commands[0].to_positional(),
            vec![FieldValue::from("_trackPageview"), FieldValue::from("/abc")]
        );
    }

    #[test]
    fn test_event_positions() {
        let commands = adaptor()
            .translate(
                &hit(
                    HitType::Event,
                    &[
                        ("eventCategory", "bar".into()),
                        ("eventAction", "foo".into()),
                        ("eventLabel", "baz".into()),
                        ("eventValue", 1.into()),
                        ("nonInteraction", true.into()),
                        ("page", "/abc".into()),
                    ],
                ),
                &Settings::default(),
            )
            .unwrap();
        let cmd = &commands[0];
        assert_eq!(cmd.name, "_trackEvent");
        assert_eq!(
            cmd.args,
            vec![
                FieldValue::from("bar"),
                FieldValue::from("foo"),
                FieldValue::from("baz"),
                FieldValue::Int(1),
                FieldValue::Bool(true),
            ]
        );
    }

    #[test]
    fn test_missing_positions_are_null() {
        let commands = adaptor()
            .translate(
                &hit(HitType::Event, &[("eventAction", "foo".into())]),
                &Settings::default(),
            )
            .unwrap();
        assert_eq!(commands[0].args[0], FieldValue::Null);
        assert_eq!(commands[0].args[1], FieldValue::from("foo"));
        assert_eq!(commands[0].args.len(), 5);
    }

    #[test]
    fn test_ignores_transport_and_user_id() {
        let settings = Settings {
            user_id: Some("abc".into()),
            transport: Some(Transport::Beacon),
            ..Default::default()
        };
        let commands = adaptor()
            .translate(&hit(HitType::Pageview, &[("page", "/x".into())]), &settings)
            .unwrap();
        assert_eq!(commands[0].args, vec![FieldValue::from("/x")]);
    }

    #[test]
    fn test_set_user_properties_unsupported() {
        let err = adaptor()
            .translate(
                &hit(HitType::SetUserProperties, &[("dimension1", "x".into())]),
                &Settings::default(),
            )
            .unwrap_err();
        assert!(matches!(err, BridgeError::Unsupported(_)));
    }

    #[test]
    fn test_require_is_noop() {
        let commands = adaptor()
            .translate(&hit(HitType::EcommerceRequire, &[]), &Settings::default())
            .unwrap();
        assert!(commands.is_empty());
    }

    #[test]
    fn test_send_with_currency() {
        let commands = adaptor()
            .translate(
                &hit(HitType::EcommerceSend, &[("currencyCode", "BRL".into())]),
                &Settings::default(),
            )
            .unwrap();
        assert_eq!(commands.len(), 2);
        assert_eq!(
            commands[0].to_positional(),
            vec![
                FieldValue::from("_set"),
                FieldValue::from("currencyCode"),
                FieldValue::from("BRL"),
            ]
        );
        assert_eq!(commands[1], Command::new("_trackTrans"));
    }

    #[test]
    fn test_dispatch_pushes_positional_entry() {
        let queue = Arc::new(RecordingQueue::default());
        let adaptor = LegacyAdaptor::new(queue.clone());
        adaptor.dispatch(Command::new("foo._trackPageview").arg("/abc"));
        assert_eq!(
            queue.entries(),
            vec![vec![
                FieldValue::from("foo._trackPageview"),
                FieldValue::from("/abc")
            ]]
        );
    }
}
