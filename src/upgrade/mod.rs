//! Upgrade catalog, player loadout and the weighted upgrade gate.
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`catalog`] | `UpgradeEffect`, `UpgradeOffer`, build pools, `PlayerLoadout` |
//! | [`selector`] | Weighted distinct sampling, stack caps, gate tokens |

pub mod catalog;
pub mod selector;

pub use catalog::{
    grand_extras, melee_pool, pool_for, ranged_pool, MeleeParams, PlayerLoadout, UpgradeEffect,
    UpgradeOffer, WeaponParams,
};
pub use selector::{pick_weighted, GateToken, OpenGate, UpgradeSelector};
