// 9.1 settlement.rs: MOCKED. in-memory, would be channel/chain txs in prod.
// the ledger drains unsettled position deltas and swept fees into batches here.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

use crate::types::{AccountId, Fixed, MarketId, Timestamp};

// Unique identifier for a settlement batch
pub type BatchId = u64;

// What a batch asks the backend to make final
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SettlementInstruction {
    // Shares issued to an account since its last settlement.
    // `paid` is the net amount that entered the pool, fees excluded
    Position {
        account: AccountId,
        market: MarketId,
        yes_shares: Fixed,
        no_shares: Fixed,
        paid: Fixed,
    },

    // Trade fees accrued by a market since the last sweep
    FeeSweep {
        market: MarketId,
        amount: Fixed,
    },
}

impl SettlementInstruction {
    fn has_negative_amount(&self) -> bool {
        match self {
            SettlementInstruction::Position { yes_shares, no_shares, paid, .. } => {
                yes_shares.is_negative() || no_shares.is_negative() || paid.is_negative()
            }
            SettlementInstruction::FeeSweep { amount, .. } => amount.is_negative(),
        }
    }
}

// Status of a settlement batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Pending,
    Committed,
    Failed,
}

// Sums over a batch, used to check nothing is lost between ledger and backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchTotals {
    pub yes_shares: Fixed,
    pub no_shares: Fixed,
    pub paid: Fixed,
    pub fees: Fixed,
}

// A batch of settlement instructions to be executed atomically
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementBatch {
    pub batch_id: BatchId,
    pub instructions: Vec<SettlementInstruction>,
    pub status: BatchStatus,
    pub created_at: Timestamp,
    pub processed_at: Option<Timestamp>,
    // Backend receipt once executed
    pub commitment: Option<String>,
}

impl SettlementBatch {
    pub fn new(batch_id: BatchId, created_at: Timestamp) -> Self {
        Self {
            batch_id,
            instructions: Vec::new(),
            status: BatchStatus::Pending,
            created_at,
            processed_at: None,
            commitment: None,
        }
    }

    pub fn add(&mut self, instruction: SettlementInstruction) {
        self.instructions.push(instruction);
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn instruction_count(&self) -> usize {
        self.instructions.len()
    }

    pub fn totals(&self) -> BatchTotals {
        let mut totals = BatchTotals::default();
        for instruction in &self.instructions {
            match instruction {
                SettlementInstruction::Position { yes_shares, no_shares, paid, .. } => {
                    totals.yes_shares = totals.yes_shares.saturating_add(*yes_shares);
                    totals.no_shares = totals.no_shares.saturating_add(*no_shares);
                    totals.paid = totals.paid.saturating_add(*paid);
                }
                SettlementInstruction::FeeSweep { amount, .. } => {
                    totals.fees = totals.fees.saturating_add(*amount);
                }
            }
        }
        totals
    }
}

// Errors from settlement operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettlementError {
    #[error("Invalid settlement instruction: {reason}")]
    InvalidInstruction { reason: String },

    #[error("Settlement backend unavailable: {message}")]
    BackendUnavailable { message: String },
}

// Manages settlement batching and execution
#[derive(Debug)]
pub struct SettlementManager {
    next_batch_id: BatchId,
    // Current batch being built
    current_batch: Option<SettlementBatch>,
    // Pending batches awaiting execution
    pending_batches: VecDeque<SettlementBatch>,
    // Completed batches (for audit trail)
    completed_batches: Vec<SettlementBatch>,
    // Maximum instructions per batch
    max_batch_size: usize,
}

impl SettlementManager {
    pub fn new(max_batch_size: usize) -> Self {
        Self {
            next_batch_id: 1,
            current_batch: None,
            pending_batches: VecDeque::new(),
            completed_batches: Vec::new(),
            max_batch_size,
        }
    }

    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    // Start a new settlement batch
    pub fn begin_batch(&mut self, timestamp: Timestamp) -> BatchId {
        let batch_id = self.next_batch_id;
        self.next_batch_id += 1;
        self.current_batch = Some(SettlementBatch::new(batch_id, timestamp));
        batch_id
    }

    // Add an instruction to the current batch
    pub fn add_instruction(&mut self, instruction: SettlementInstruction) -> Result<(), SettlementError> {
        let batch = self.current_batch.as_mut()
            .ok_or_else(|| SettlementError::InvalidInstruction {
                reason: "No active batch".to_string(),
            })?;

        if batch.instruction_count() >= self.max_batch_size {
            return Err(SettlementError::InvalidInstruction {
                reason: "Batch is full".to_string(),
            });
        }

        batch.add(instruction);
        Ok(())
    }

    // Finalize the current batch and queue for execution
    pub fn commit_batch(&mut self) -> Result<BatchId, SettlementError> {
        let batch = self.current_batch.take()
            .ok_or_else(|| SettlementError::InvalidInstruction {
                reason: "No active batch".to_string(),
            })?;

        if batch.is_empty() {
            return Err(SettlementError::InvalidInstruction {
                reason: "Cannot commit empty batch".to_string(),
            });
        }

        let batch_id = batch.batch_id;
        self.pending_batches.push_back(batch);
        Ok(batch_id)
    }

    // Abort the current batch without committing
    pub fn abort_batch(&mut self) {
        self.current_batch = None;
    }

    // Get the next pending batch for execution
    pub fn next_pending(&mut self) -> Option<SettlementBatch> {
        self.pending_batches.pop_front()
    }

    pub fn pending(&self) -> impl Iterator<Item = &SettlementBatch> {
        self.pending_batches.iter()
    }

    // Mark a batch as completed
    pub fn mark_completed(&mut self, mut batch: SettlementBatch, commitment: String, timestamp: Timestamp) {
        batch.status = BatchStatus::Committed;
        batch.commitment = Some(commitment);
        batch.processed_at = Some(timestamp);
        self.completed_batches.push(batch);
    }

    // Mark a batch as failed
    pub fn mark_failed(&mut self, mut batch: SettlementBatch, timestamp: Timestamp) {
        batch.status = BatchStatus::Failed;
        batch.processed_at = Some(timestamp);
        self.completed_batches.push(batch);
    }

    pub fn completed(&self) -> &[SettlementBatch] {
        &self.completed_batches
    }

    pub fn pending_count(&self) -> usize {
        self.pending_batches.len()
    }

    pub fn completed_count(&self) -> usize {
        self.completed_batches.len()
    }

    pub fn current_batch_size(&self) -> usize {
        self.current_batch.as_ref().map(|b| b.instruction_count()).unwrap_or(0)
    }
}

// Trait for settlement execution backends
pub trait SettlementBackend {
    // Execute a settlement batch
    fn execute(&mut self, batch: &SettlementBatch) -> Result<String, SettlementError>;

    // Check the status of a previously submitted batch
    fn check_status(&self, commitment: &str) -> BatchStatus;

    // Get the backend type identifier
    fn backend_type(&self) -> &str;
}

// Final holdings per (account, market) as the backend sees them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SettledHolding {
    pub yes_shares: Fixed,
    pub no_shares: Fixed,
    pub paid: Fixed,
}

// In memory settlement backend for testing and simulation
#[derive(Debug, Default)]
pub struct InMemorySettlement {
    holdings: HashMap<(AccountId, MarketId), SettledHolding>,
    fee_pools: HashMap<MarketId, Fixed>,
    executed_batches: Vec<String>,
}

impl InMemorySettlement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn holding(&self, account: AccountId, market: MarketId) -> SettledHolding {
        self.holdings.get(&(account, market)).copied().unwrap_or_default()
    }

    pub fn fee_pool(&self, market: MarketId) -> Fixed {
        self.fee_pools.get(&market).copied().unwrap_or(Fixed::ZERO)
    }

    pub fn executed_count(&self) -> usize {
        self.executed_batches.len()
    }
}

impl SettlementBackend for InMemorySettlement {
    fn execute(&mut self, batch: &SettlementBatch) -> Result<String, SettlementError> {
        // validate all instructions first
        if let Some(bad) = batch.instructions.iter().find(|i| i.has_negative_amount()) {
            return Err(SettlementError::InvalidInstruction {
                reason: format!("negative amount in {:?}", bad),
            });
        }

        // apply all instructions
        for instruction in &batch.instructions {
            match instruction {
                SettlementInstruction::Position { account, market, yes_shares, no_shares, paid } => {
                    let holding = self.holdings.entry((*account, *market)).or_default();
                    holding.yes_shares = holding.yes_shares.saturating_add(*yes_shares);
                    holding.no_shares = holding.no_shares.saturating_add(*no_shares);
                    holding.paid = holding.paid.saturating_add(*paid);
                }
                SettlementInstruction::FeeSweep { market, amount } => {
                    let pool = self.fee_pools.entry(*market).or_insert(Fixed::ZERO);
                    *pool = pool.saturating_add(*amount);
                }
            }
        }

        let commitment = format!("batch-{}", batch.batch_id);
        self.executed_batches.push(commitment.clone());
        Ok(commitment)
    }

    fn check_status(&self, commitment: &str) -> BatchStatus {
        if self.executed_batches.iter().any(|c| c == commitment) {
            BatchStatus::Committed
        } else {
            BatchStatus::Pending
        }
    }

    fn backend_type(&self) -> &str {
        "in_memory"
    }
}
