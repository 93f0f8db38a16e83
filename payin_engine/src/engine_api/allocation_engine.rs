use std::{collections::HashSet, fmt::Debug, sync::Arc};

use log::*;
use rand::Rng;
use rust_decimal::Decimal;

use crate::{
    db_types::Allocation,
    eligibility::{ceil_to_step, AmountBand, InvalidConstraintInput},
    engine_api::{errors::AllocationError, request_objects::AllocationRequest},
    traits::{AuxDataSource, CandidateRepository},
};

/// Picks an index in `0..n` for a non-empty candidate list of length `n`.
pub type ChannelPicker = Arc<dyn Fn(usize) -> usize + Send + Sync>;

/// The default picker: every candidate is equally likely.
pub fn uniform_picker() -> ChannelPicker {
    Arc::new(|n| rand::thread_rng().gen_range(0..n))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationPolicy {
    /// Flexible amounts are multiples of this step
    pub step: Decimal,
    /// The flexible range used when the request does not give one
    pub default_flexible_range: u32,
}

impl Default for AllocationPolicy {
    fn default() -> Self {
        Self { step: Decimal::from(5), default_flexible_range: 20 }
    }
}

/// Binds an allocation request to exactly one eligible requisite.
///
/// 1. Look for requisites that accept the requested amount as is.
/// 2. Failing that, and if the merchant allows it, look for requisites that accept a slightly higher amount: a
///    multiple of [`AllocationPolicy::step`] between the requested amount rounded up and the amount plus the flexible
///    range. Each requisite is offered at the smallest amount it accepts.
/// 3. Prefer requisites from boosted teams. If none of the candidates is boosted, every candidate stays in the draw.
/// 4. Draw one candidate with the [`ChannelPicker`].
pub struct AllocationEngine<B, A> {
    db: B,
    aux: A,
    policy: AllocationPolicy,
    picker: ChannelPicker,
}

impl<B, A> Debug for AllocationEngine<B, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AllocationEngine ({:?})", self.policy)
    }
}

impl<B, A> AllocationEngine<B, A> {
    pub fn new(db: B, aux: A) -> Self {
        Self { db, aux, policy: AllocationPolicy::default(), picker: uniform_picker() }
    }

    pub fn with_policy(mut self, policy: AllocationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_picker(mut self, picker: ChannelPicker) -> Self {
        self.picker = picker;
        self
    }

    pub fn policy(&self) -> &AllocationPolicy {
        &self.policy
    }

    /// The band searched by the flexible fallback for `request`.
    pub fn flexible_band(&self, request: &AllocationRequest) -> Result<AmountBand, AllocationError> {
        let range = match request.flexible_range {
            Some(r) if r > 0 => r,
            _ => self.policy.default_flexible_range,
        };
        let out_of_range =
            || InvalidConstraintInput(format!("flexible band for {} (+{range}) is out of range", request.amount));
        let low = ceil_to_step(request.amount, self.policy.step).ok_or_else(out_of_range)?;
        let high = request.amount.checked_add(Decimal::from(range)).ok_or_else(out_of_range)?;
        Ok(AmountBand::new(low, high, self.policy.step)?)
    }
}

impl<B, A> AllocationEngine<B, A>
where
    B: CandidateRepository,
    A: AuxDataSource,
{
    pub async fn select(&self, request: &AllocationRequest) -> Result<Allocation, AllocationError> {
        let no_channels = || AllocationError::NoAvailableChannels {
            merchant_id: request.merchant_id.clone(),
            channel_type: request.channel_type,
            amount: request.amount,
        };
        if request.amount <= Decimal::ZERO {
            return Err(InvalidConstraintInput(format!("amount {} is not positive", request.amount)).into());
        }
        let query = request.candidate_query();
        let exact = self.db.query_exact(&query, request.amount).await?;
        let candidates = if !exact.is_empty() {
            trace!("🎯️ {} exact candidates for {} {}", exact.len(), request.channel_type, request.amount);
            exact.into_iter().map(|r| Allocation::exact(r, request.amount)).collect::<Vec<_>>()
        } else if !request.allow_flexible_amount {
            debug!("🎯️ No exact match for {} {} and flexible amounts are disabled", request.channel_type, request.amount);
            return Err(no_channels());
        } else {
            let band = self.flexible_band(request)?;
            let matches = self.db.query_flexible(&query, &band).await?;
            trace!("🎯️ {} flexible candidates for {} in {band}", matches.len(), request.channel_type);
            matches.into_iter().map(Allocation::from).collect::<Vec<_>>()
        };
        if candidates.is_empty() {
            debug!("🎯️ No requisites for merchant {} {} {}", request.merchant_id, request.channel_type, request.amount);
            return Err(no_channels());
        }
        let boosted = self.boosted_teams().await;
        let allocation = self.pick(candidates, &boosted);
        debug!(
            "🎯️ Requisite {} allocated for merchant {} at {} (flexible: {})",
            allocation.requisite.id, request.merchant_id, allocation.amount, allocation.is_flexible
        );
        Ok(allocation)
    }

    async fn boosted_teams(&self) -> HashSet<String> {
        match self.aux.fetch_boosted_team_ids().await {
            Ok(ids) => ids.into_iter().collect(),
            Err(e) => {
                warn!("🎯️ Could not fetch boosted teams. Allocating without a boost preference. {e}");
                HashSet::new()
            },
        }
    }

    fn pick(&self, mut candidates: Vec<Allocation>, boosted: &HashSet<String>) -> Allocation {
        let preferred = candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| c.requisite.is_in_team(boosted))
            .map(|(i, _)| i)
            .collect::<Vec<_>>();
        let pool = if preferred.is_empty() { (0..candidates.len()).collect() } else { preferred };
        let choice = (self.picker)(pool.len()) % pool.len();
        candidates.swap_remove(pool[choice])
    }
}
