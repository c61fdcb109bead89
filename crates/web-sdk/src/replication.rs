//! Replication of translated commands across additional tracking accounts.

use ga_bridge_core::{Command, HitType, Settings};
use tracing::debug;

const USER_ID_FIELD: &str = "userId";

/// The primary command followed by one namespaced copy per additional
/// account, when the hit type is enabled for replication.
///
/// Copies are independent of each other and of `base`. When the user id is
/// not replicated it is stripped from the copies only.
pub fn replicate(base: Command, hit_type: HitType, settings: &Settings) -> Vec<Command> {
    let toggles = &settings.additional_account_hit_types;
    if !toggles.replicates(hit_type) || settings.additional_account_names.is_empty() {
        return vec![base];
    }

    let mut commands = Vec::with_capacity(settings.additional_account_names.len() + 1);
    let replicas: Vec<Command> = settings
        .additional_account_names
        .iter()
        .map(|account| {
            let mut copy = base.namespaced(account);
            if !toggles.user_id {
                if let Some(fields) = copy.fields_mut() {
                    fields.remove(USER_ID_FIELD);
                }
            }
            copy
        })
        .collect();

    debug!(
        hit_type = %hit_type,
        command = %base.name,
        replicas = replicas.len(),
        "command replicated to additional accounts"
    );

    commands.push(base);
    commands.extend(replicas);
    commands
}
