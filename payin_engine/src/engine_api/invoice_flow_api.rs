use std::{fmt::Debug, time::Duration};

use log::*;

use crate::{
    db_types::{Allocation, IssuedInvoice},
    engine_api::{
        allocation_engine::AllocationEngine,
        errors::{AllocationError, AssemblyError, InvoiceFlowError},
        invoice_assembler::InvoiceAssembler,
        merchant_gate::MerchantGate,
        request_objects::{AllocationRequest, NewInvoiceRequest},
    },
    traits::{AuxDataSource, CandidateRepository, InvoicePersistence, MerchantStore},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowSettings {
    /// Upper bound on a single requisite selection. `None` waits indefinitely.
    pub allocation_timeout: Option<Duration>,
    /// How many times a request may be re-allocated after losing its requisite to a concurrent invoice. At least one
    /// attempt is always made.
    pub max_allocation_attempts: usize,
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self { allocation_timeout: None, max_allocation_attempts: 3 }
    }
}

/// `InvoiceFlowApi` is the primary API for turning a merchant's pay-in request into a stored invoice.
///
/// The request passes through the merchant gate, the allocation engine and the invoice assembler in that order. If the
/// invoice store reports that the selected requisite was claimed in the meantime, the requisite is excluded and
/// allocation runs again.
pub struct InvoiceFlowApi<B, A> {
    gate: MerchantGate<B>,
    engine: AllocationEngine<B, A>,
    assembler: InvoiceAssembler<B, A>,
    settings: FlowSettings,
}

impl<B, A> Debug for InvoiceFlowApi<B, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "InvoiceFlowApi ({:?})", self.settings)
    }
}

impl<B: Clone, A: Clone> InvoiceFlowApi<B, A> {
    pub fn new(db: B, aux: A) -> Self {
        Self::from_parts(
            MerchantGate::new(db.clone()),
            AllocationEngine::new(db.clone(), aux.clone()),
            InvoiceAssembler::new(db, aux),
        )
    }
}

impl<B, A> InvoiceFlowApi<B, A> {
    pub fn from_parts(
        gate: MerchantGate<B>,
        engine: AllocationEngine<B, A>,
        assembler: InvoiceAssembler<B, A>,
    ) -> Self {
        Self { gate, engine, assembler, settings: FlowSettings::default() }
    }

    pub fn with_settings(mut self, settings: FlowSettings) -> Self {
        let max_allocation_attempts = settings.max_allocation_attempts.max(1);
        self.settings = FlowSettings { max_allocation_attempts, ..settings };
        self
    }

    pub fn settings(&self) -> &FlowSettings {
        &self.settings
    }
}

impl<B, A> InvoiceFlowApi<B, A>
where
    B: MerchantStore + CandidateRepository + InvoicePersistence,
    A: AuxDataSource,
{
    /// Validates the request, picks a requisite for it and stores the resulting invoice.
    pub async fn create_invoice(&self, request: NewInvoiceRequest) -> Result<IssuedInvoice, InvoiceFlowError> {
        request.validate().map_err(InvoiceFlowError::InvalidRequest)?;
        let channel_type = self.gate.validate(&request.merchant_id, request.amount, &request.channel_type).await?;
        let merchant = request.merchant_context();
        let mut allocation_request = request.allocation_request(channel_type);
        for attempt in 1..=self.settings.max_allocation_attempts {
            let allocation = self.allocate(&allocation_request).await?;
            match self.assembler.build(&allocation, &merchant, request.active_time).await {
                Ok(invoice) => return Ok(IssuedInvoice { invoice, requisite: allocation.requisite }),
                Err(AssemblyError::ChannelConflict(requisite_id)) => {
                    warn!(
                        "🔄️ Requisite {requisite_id} was claimed by another invoice (attempt {attempt} of {}) for \
                         merchant {}. Allocating again.",
                        self.settings.max_allocation_attempts, request.merchant_id
                    );
                    allocation_request.excluded_requisites.push(requisite_id);
                },
                Err(e) => return Err(e.into()),
            }
        }
        warn!(
            "🔄️ Giving up on merchant {} {} {} after {} conflicting allocations",
            request.merchant_id, channel_type, request.amount, self.settings.max_allocation_attempts
        );
        Err(AllocationError::NoAvailableChannels {
            merchant_id: request.merchant_id,
            channel_type,
            amount: request.amount,
        }
        .into())
    }

    async fn allocate(&self, request: &AllocationRequest) -> Result<Allocation, InvoiceFlowError> {
        match self.settings.allocation_timeout {
            Some(limit) => tokio::time::timeout(limit, self.engine.select(request))
                .await
                .map_err(|_| {
                    warn!(
                        "🔄️ Allocation for merchant {} {} {} timed out",
                        request.merchant_id, request.channel_type, request.amount
                    );
                    InvoiceFlowError::AllocationTimedOut(limit.as_millis())
                })?
                .map_err(InvoiceFlowError::from),
            None => Ok(self.engine.select(request).await?),
        }
    }
}
