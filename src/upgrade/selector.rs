//! Weighted offer sampling and the upgrade gate.
//!
//! A gate shows up to `offer_count` distinct offers drawn without replacement.
//! Each draw rolls uniformly in `[0, total_weight)` and walks the cumulative
//! weights; the first offer whose running sum exceeds the roll wins.  Offers
//! with a stack cap leave the pool for good once taken that many times.

use super::catalog::{grand_extras, pool_for, PlayerLoadout, UpgradeOffer};
use crate::difficulty::CombatStyle;
use crate::error::{CoreError, CoreResult};
use crate::stats::StatBlock;
use bevy::log::info;
use rand::Rng;
use std::collections::HashMap;

/// Identifies one opened gate.  Tokens from cancelled or closed gates are stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GateToken(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub struct OpenGate {
    pub token: GateToken,
    pub grand: bool,
    pub offers: Vec<UpgradeOffer>,
}

#[derive(Debug, Clone)]
pub struct UpgradeSelector {
    pool: Vec<UpgradeOffer>,
    grand_extras: Vec<UpgradeOffer>,
    taken: HashMap<&'static str, u32>,
    offer_count: usize,
    gate: Option<OpenGate>,
}

/// Index of the offer selected by one weighted roll, `None` if nothing has weight.
pub fn pick_weighted<R: Rng + ?Sized>(candidates: &[UpgradeOffer], rng: &mut R) -> Option<usize> {
    let total: f32 = candidates.iter().map(|o| o.weight.max(0.0)).sum();
    if total <= 0.0 {
        return None;
    }
    let roll = rng.gen_range(0.0..total);
    let mut cumulative = 0.0;
    for (i, offer) in candidates.iter().enumerate() {
        cumulative += offer.weight.max(0.0);
        if roll < cumulative {
            return Some(i);
        }
    }
    // Rounding can leave the roll a hair above the final sum.
    candidates.iter().rposition(|o| o.weight > 0.0)
}

impl UpgradeSelector {
    pub fn new(pool: Vec<UpgradeOffer>, grand_extras: Vec<UpgradeOffer>, offer_count: usize) -> Self {
        Self {
            pool,
            grand_extras,
            taken: HashMap::new(),
            offer_count,
            gate: None,
        }
    }

    pub fn for_style(style: CombatStyle, offer_count: usize) -> Self {
        Self::new(pool_for(style), grand_extras(), offer_count)
    }

    fn candidates(&self, grand: bool) -> Vec<UpgradeOffer> {
        let extras = if grand { self.grand_extras.as_slice() } else { &[] };
        self.pool
            .iter()
            .chain(extras)
            .filter(|o| o.weight > 0.0 && !self.is_capped_out(o))
            .cloned()
            .collect()
    }

    /// Draw up to `count` distinct offers.
    pub fn offer<R: Rng + ?Sized>(&self, count: usize, grand: bool, rng: &mut R) -> Vec<UpgradeOffer> {
        let mut remaining = self.candidates(grand);
        let mut picked = Vec::with_capacity(count.min(remaining.len()));
        while picked.len() < count {
            let Some(i) = pick_weighted(&remaining, rng) else {
                break;
            };
            picked.push(remaining.swap_remove(i));
        }
        picked
    }

    /// Open a gate under `token`.  Replaces any gate still open.
    pub fn open_gate<R: Rng + ?Sized>(
        &mut self,
        token: GateToken,
        grand: bool,
        rng: &mut R,
    ) -> CoreResult<&OpenGate> {
        let offers = self.offer(self.offer_count, grand, rng);
        if offers.is_empty() {
            self.gate = None;
            return Err(CoreError::EmptyUpgradePool);
        }
        info!(
            "Upgrade gate {:?} opened ({}): {:?}",
            token,
            if grand { "grand" } else { "regular" },
            offers.iter().map(|o| o.title).collect::<Vec<_>>()
        );
        Ok(self.gate.insert(OpenGate {
            token,
            grand,
            offers,
        }))
    }

    pub fn gate(&self) -> Option<&OpenGate> {
        self.gate.as_ref()
    }

    /// Apply offer `index` of the gate opened under `token` and close it.
    pub fn choose(
        &mut self,
        token: GateToken,
        index: usize,
        loadout: &mut PlayerLoadout,
        stats: &mut StatBlock,
    ) -> CoreResult<UpgradeOffer> {
        let gate = self.gate.as_ref().ok_or(CoreError::NoOpenGate)?;
        if gate.token != token {
            return Err(CoreError::StaleGate {
                token: token.0,
                current: gate.token.0,
            });
        }
        let offer = gate
            .offers
            .get(index)
            .cloned()
            .ok_or(CoreError::InvalidChoice {
                index,
                offered: gate.offers.len(),
            })?;

        offer.effect.apply(loadout, stats);
        let taken = self.taken.entry(offer.title).or_insert(0);
        *taken += 1;
        if offer.stack_cap.is_some_and(|cap| *taken >= cap) {
            self.pool.retain(|o| o.title != offer.title);
            self.grand_extras.retain(|o| o.title != offer.title);
        }
        self.gate = None;
        info!("Upgrade applied: {}", offer.title);
        Ok(offer)
    }

    /// Drop the open gate; its token becomes stale.
    pub fn cancel(&mut self) {
        self.gate = None;
    }

    pub fn times_taken(&self, title: &str) -> u32 {
        self.taken.get(title).copied().unwrap_or(0)
    }

    fn is_capped_out(&self, offer: &UpgradeOffer) -> bool {
        offer
            .stack_cap
            .is_some_and(|cap| self.times_taken(offer.title) >= cap)
    }

    /// Whether `title` can still be offered at a regular gate.
    pub fn in_pool(&self, title: &str) -> bool {
        self.pool.iter().any(|o| o.title == title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::upgrade::catalog::UpgradeEffect;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn equal_pool() -> Vec<UpgradeOffer> {
        vec![
            UpgradeOffer::new("A", 1.0, UpgradeEffect::Heal(1)),
            UpgradeOffer::new("B", 1.0, UpgradeEffect::Heal(1)),
            UpgradeOffer::new("C", 1.0, UpgradeEffect::Heal(1)),
        ]
    }

    fn player() -> (PlayerLoadout, StatBlock) {
        let config = GameConfig::default();
        (
            PlayerLoadout::from_config(CombatStyle::Ranged, &config),
            StatBlock::new(10, 5.0, 0, 0),
        )
    }

    #[test]
    fn equal_weights_sample_uniformly() {
        let selector = UpgradeSelector::new(equal_pool(), Vec::new(), 3);
        let mut rng = StdRng::seed_from_u64(7);
        let mut counts: HashMap<&str, u32> = HashMap::new();
        for _ in 0..10_000 {
            let offer = selector.offer(1, false, &mut rng);
            *counts.entry(offer[0].title).or_insert(0) += 1;
        }
        let expected = 10_000.0 / 3.0;
        for title in ["A", "B", "C"] {
            let n = counts.get(title).copied().unwrap_or(0) as f32;
            assert!(
                (n - expected).abs() <= expected * 0.05,
                "{title} drawn {n} times"
            );
        }
    }

    #[test]
    fn offers_are_distinct_and_bounded_by_pool() {
        let selector = UpgradeSelector::new(equal_pool()[..2].to_vec(), Vec::new(), 3);
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..50 {
            let offers = selector.offer(3, false, &mut rng);
            assert_eq!(offers.len(), 2);
            assert_ne!(offers[0].title, offers[1].title);
        }
    }

    #[test]
    fn zero_weight_is_never_drawn() {
        let pool = vec![
            UpgradeOffer::new("Never", 0.0, UpgradeEffect::FullHeal),
            UpgradeOffer::new("Always", 5.0, UpgradeEffect::FullHeal),
        ];
        let selector = UpgradeSelector::new(pool, Vec::new(), 3);
        let mut rng = StdRng::seed_from_u64(3);
        let offers = selector.offer(3, false, &mut rng);
        assert_eq!(offers.len(), 1);
        assert_eq!(offers[0].title, "Always");
    }

    #[test]
    fn power_leaves_pool_after_two_stacks() {
        let pool = vec![UpgradeOffer::new("Power +1", 1.0, UpgradeEffect::Power(1)).capped(2)];
        let mut selector = UpgradeSelector::new(pool, Vec::new(), 3);
        let mut rng = StdRng::seed_from_u64(9);
        let (mut loadout, mut stats) = player();
        let base = loadout.weapon.damage;

        for round in 1..=2u64 {
            selector
                .open_gate(GateToken(round), false, &mut rng)
                .expect("pool still has power");
            selector
                .choose(GateToken(round), 0, &mut loadout, &mut stats)
                .expect("valid choice");
        }
        assert_eq!(loadout.weapon.damage, base + 2);
        assert!(!selector.in_pool("Power +1"));
        assert!(matches!(
            selector.open_gate(GateToken(3), false, &mut rng),
            Err(CoreError::EmptyUpgradePool)
        ));
    }

    #[test]
    fn grand_gate_adds_grand_only_offers() {
        let selector = UpgradeSelector::for_style(CombatStyle::Ranged, 3);
        let mut rng = StdRng::seed_from_u64(11);
        let grand_titles: Vec<&str> = grand_extras().iter().map(|o| o.title).collect();

        let mut saw_grand = false;
        for _ in 0..200 {
            let regular = selector.offer(3, false, &mut rng);
            assert!(regular.iter().all(|o| !grand_titles.contains(&o.title)));
            saw_grand |= selector
                .offer(3, true, &mut rng)
                .iter()
                .any(|o| grand_titles.contains(&o.title));
        }
        assert!(saw_grand);
    }

    #[test]
    fn stale_token_and_bad_index_are_rejected() {
        let mut selector = UpgradeSelector::new(equal_pool(), Vec::new(), 3);
        let mut rng = StdRng::seed_from_u64(5);
        let (mut loadout, mut stats) = player();

        selector
            .open_gate(GateToken(4), false, &mut rng)
            .expect("gate opens");
        assert!(matches!(
            selector.choose(GateToken(3), 0, &mut loadout, &mut stats),
            Err(CoreError::StaleGate { token: 3, current: 4 })
        ));
        assert!(matches!(
            selector.choose(GateToken(4), 7, &mut loadout, &mut stats),
            Err(CoreError::InvalidChoice { index: 7, offered: 3 })
        ));
        assert!(selector.choose(GateToken(4), 1, &mut loadout, &mut stats).is_ok());
        assert!(matches!(
            selector.choose(GateToken(4), 0, &mut loadout, &mut stats),
            Err(CoreError::NoOpenGate)
        ));
    }

    #[test]
    fn cancel_invalidates_open_gate() {
        let mut selector = UpgradeSelector::new(equal_pool(), Vec::new(), 3);
        let mut rng = StdRng::seed_from_u64(5);
        let (mut loadout, mut stats) = player();
        selector
            .open_gate(GateToken(1), false, &mut rng)
            .expect("gate opens");
        selector.cancel();
        assert!(selector.gate().is_none());
        assert!(selector
            .choose(GateToken(1), 0, &mut loadout, &mut stats)
            .is_err());
    }
}
