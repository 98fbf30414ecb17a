//! Step display names
//!
//! Names double as identifiers for the UI and the turn log, so they have to
//! stay stable across releases.

pub const FIRE_SUFFIX: &str = " fire";
pub const AA_GUNS_FIRE_SUFFIX: &str = " fire";
pub const SELECT_PREFIX: &str = " select ";
pub const NOTIFY_PREFIX: &str = " notify ";
pub const CASUALTIES_SUFFIX: &str = " casualties";
pub const CASUALTIES_WITHOUT_SPACE_SUFFIX: &str = "casualties";

pub const UNITS: &str = "units";
pub const FIRST_STRIKE_UNITS: &str = "first strike units";
pub const NAVAL_BOMBARD: &str = "naval bombard";
pub const AIR_FIRE_NON_SUBS: &str = "air vs non subs";
pub const SUICIDE: &str = "suicide";

pub const REMOVE_CASUALTIES: &str = "Remove casualties";
pub const REMOVE_SNEAK_ATTACK_CASUALTIES: &str = "Remove sneak attack casualties";
pub const REMOVE_BOMBARDMENT_CASUALTIES: &str = "Remove bombardment casualties";
pub const REMOVE_UNESCORTED_TRANSPORTS: &str = "Remove unescorted transports";
pub const SUBMERGE_SUBS_VS_AIR_ONLY: &str = "Submerge subs vs air only";
pub const LAND_PARATROOPS: &str = "Land paratroops";

pub const SUBS_SUBMERGE: &str = " submerge subs";
pub const SUBS_WITHDRAW: &str = " withdraw subs";
pub const ATTACKER_WITHDRAW: &str = " withdraw";

/// The plain `units` group reads "Germans fire"; any other group is spelled out
pub fn fire_name(player: &str, group: &str) -> String {
    if group == UNITS {
        format!("{}{}", player, FIRE_SUFFIX)
    } else {
        format!("{} {}{}", player, group, FIRE_SUFFIX)
    }
}

pub fn aa_fire_name(player: &str, aa_type: &str) -> String {
    format!("{} {}{}", player, aa_type, AA_GUNS_FIRE_SUFFIX)
}

pub fn select_casualties_name(hit_player: &str, group: &str) -> String {
    if group == UNITS {
        format!(
            "{}{}{}",
            hit_player, SELECT_PREFIX, CASUALTIES_WITHOUT_SPACE_SUFFIX
        )
    } else {
        format!("{}{}{}{}", hit_player, SELECT_PREFIX, group, CASUALTIES_SUFFIX)
    }
}

pub fn notify_casualties_name(hit_player: &str, group: &str) -> String {
    if group == UNITS {
        format!(
            "{}{}{}",
            hit_player, NOTIFY_PREFIX, CASUALTIES_WITHOUT_SPACE_SUFFIX
        )
    } else {
        format!("{}{}{}{}", hit_player, NOTIFY_PREFIX, group, CASUALTIES_SUFFIX)
    }
}
