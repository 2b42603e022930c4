// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Expense hand-off.

use std::sync::Mutex;

use kassenbon_core::error::Result;
use kassenbon_core::types::ExpenseOutput;

/// Wherever confirmed expenses go (an expense list, a database, a sync
/// queue). Implementations own the output, including any retained image.
pub trait ExpenseSink: Send + Sync {
    fn persist(&self, expense: ExpenseOutput) -> Result<()>;
}

/// Keeps handed-off expenses in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    expenses: Mutex<Vec<ExpenseOutput>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.expenses.lock().expect("memory sink lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove and return everything persisted so far.
    pub fn take(&self) -> Vec<ExpenseOutput> {
        std::mem::take(&mut *self.expenses.lock().expect("memory sink lock poisoned"))
    }
}

impl ExpenseSink for MemorySink {
    fn persist(&self, expense: ExpenseOutput) -> Result<()> {
        self.expenses
            .lock()
            .expect("memory sink lock poisoned")
            .push(expense);
        Ok(())
    }
}
