use super::pairs::ItemPair;
use super::records::ItemId;
use super::stats::{ItemStats, ItemStatsEntry};
use std::cmp::Ordering;

/// A pairwise rule with both directions' confidence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssociationRule {
    pub item_a: ItemId,
    pub item_b: ItemId,
    pub freq_ab: usize,
    pub support_ab: f64,
    pub freq_a: usize,
    pub support_a: f64,
    pub freq_b: usize,
    pub support_b: f64,
    pub confidence_a_to_b: f64,
    pub confidence_b_to_a: f64,
    pub lift: f64,
}

impl AssociationRule {
    /// Supports are percentages. Confidence is unscaled since both operands
    /// share the percent scale; lift is the ratio of observed to expected
    /// joint probability, hence the extra factor of 100.
    pub fn from_stats(
        pair: ItemPair,
        freq_ab: usize,
        support_ab: f64,
        a: &ItemStatsEntry,
        b: &ItemStatsEntry,
    ) -> Self {
        Self {
            item_a: pair.first(),
            item_b: pair.second(),
            freq_ab,
            support_ab,
            freq_a: a.frequency,
            support_a: a.support,
            freq_b: b.frequency,
            support_b: b.support,
            confidence_a_to_b: support_ab / a.support,
            confidence_b_to_a: support_ab / b.support,
            lift: support_ab * 100.0 / (a.support * b.support),
        }
    }

    /// The same rule with the roles of A and B exchanged.
    pub fn swapped(&self) -> Self {
        Self {
            item_a: self.item_b,
            item_b: self.item_a,
            freq_a: self.freq_b,
            support_a: self.support_b,
            freq_b: self.freq_a,
            support_b: self.support_a,
            confidence_a_to_b: self.confidence_b_to_a,
            confidence_b_to_a: self.confidence_a_to_b,
            ..*self
        }
    }
}

/// Lift descending, then joint support descending, then item ids ascending.
pub fn rank_order(a: &AssociationRule, b: &AssociationRule) -> Ordering {
    b.lift
        .total_cmp(&a.lift)
        .then_with(|| b.support_ab.total_cmp(&a.support_ab))
        .then_with(|| a.item_a.cmp(&b.item_a))
        .then_with(|| a.item_b.cmp(&b.item_b))
}

/// Rules in rank order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleTable {
    rules: Vec<AssociationRule>,
}

impl RuleTable {
    pub fn ranked(mut rules: Vec<AssociationRule>) -> Self {
        rules.sort_by(rank_order);
        Self { rules }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AssociationRule> {
        self.rules.iter()
    }

    pub fn as_slice(&self) -> &[AssociationRule] {
        &self.rules
    }

    pub fn into_vec(self) -> Vec<AssociationRule> {
        self.rules
    }

    /// The rule for two items, in either order.
    pub fn find(&self, a: ItemId, b: ItemId) -> Option<&AssociationRule> {
        let pair = ItemPair::new(a, b);
        self.rules
            .iter()
            .find(|rule| rule.item_a == pair.first() && rule.item_b == pair.second())
    }
}

impl<'a> IntoIterator for &'a RuleTable {
    type Item = &'a AssociationRule;
    type IntoIter = std::slice::Iter<'a, AssociationRule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}

/// Joins surviving pairs with item statistics. Pairs whose items are missing
/// from `stats` are skipped.
pub fn compute_rules<I>(pairs: I, stats: &ItemStats) -> Vec<AssociationRule>
where
    I: IntoIterator<Item = (ItemPair, usize, f64)>,
{
    pairs
        .into_iter()
        .filter_map(|(pair, freq_ab, support_ab)| {
            let a = stats.get(pair.first())?;
            let b = stats.get(pair.second())?;
            Some(AssociationRule::from_stats(pair, freq_ab, support_ab, a, b))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(frequency: usize, support: f64) -> ItemStatsEntry {
        ItemStatsEntry { frequency, support }
    }

    #[test]
    fn metrics_follow_percent_scale() {
        let rule = AssociationRule::from_stats(
            ItemPair::new(1, 2),
            3,
            60.0,
            &entry(4, 80.0),
            &entry(3, 60.0),
        );
        assert_eq!(rule.confidence_a_to_b, 0.75);
        assert_eq!(rule.confidence_b_to_a, 1.0);
        assert!((rule.lift - 1.25).abs() < 1e-12);
    }

    #[test]
    fn lift_is_symmetric() {
        let forward = AssociationRule::from_stats(
            ItemPair::new(1, 2),
            7,
            7.0,
            &entry(13, 13.0),
            &entry(29, 29.0),
        );
        let backward = AssociationRule::from_stats(
            ItemPair::new(1, 2),
            7,
            7.0,
            &entry(29, 29.0),
            &entry(13, 13.0),
        );
        assert_eq!(forward.lift, backward.lift);
        assert_eq!(forward.swapped().lift, forward.lift);
        assert_eq!(forward.swapped().confidence_a_to_b, forward.confidence_b_to_a);
    }

    #[test]
    fn ranking_breaks_lift_ties_deterministically() {
        let base = AssociationRule::from_stats(
            ItemPair::new(1, 2),
            1,
            10.0,
            &entry(1, 10.0),
            &entry(1, 10.0),
        );
        let high_lift = AssociationRule {
            lift: base.lift * 2.0,
            item_a: 8,
            item_b: 9,
            ..base
        };
        let more_support = AssociationRule {
            support_ab: 20.0,
            item_a: 5,
            item_b: 6,
            ..base
        };
        let later_item = AssociationRule {
            item_a: 1,
            item_b: 3,
            ..base
        };

        let table = RuleTable::ranked(vec![later_item, base, more_support, high_lift]);
        let order: Vec<(i64, i64)> = table.iter().map(|r| (r.item_a, r.item_b)).collect();
        assert_eq!(order, vec![(8, 9), (5, 6), (1, 2), (1, 3)]);
        assert!(table.find(9, 8).is_some());
        assert!(table.find(2, 9).is_none());

        let owned = table.clone().into_vec();
        assert_eq!(owned.as_slice(), table.as_slice());
    }
}
