//! The external collection and print systems the pipeline drives.
//!
//! Both are opaque to the pipeline: a call that may take arbitrarily long and
//! reports success or failure. The simulated implementations stand in for the
//! real services when running the binary.

use crate::models::BankAccount;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;
use tracing::debug;

pub trait CollectionSystem: Send + Sync {
    fn collect(&self, account: &BankAccount) -> bool;
}

pub trait PrintSystem: Send + Sync {
    fn print_confirmation(&self, bank_name: &str, account: &BankAccount, holder_name: &str)
        -> bool;
}

impl<F> CollectionSystem for F
where
    F: Fn(&BankAccount) -> bool + Send + Sync,
{
    fn collect(&self, account: &BankAccount) -> bool {
        self(account)
    }
}

impl<F> PrintSystem for F
where
    F: Fn(&str, &BankAccount, &str) -> bool + Send + Sync,
{
    fn print_confirmation(
        &self,
        bank_name: &str,
        account: &BankAccount,
        holder_name: &str,
    ) -> bool {
        self(bank_name, account, holder_name)
    }
}

/// `fail_every = Some(n)` fails every account whose id is a multiple of `n`.
fn fails(fail_every: Option<u32>, account: &BankAccount) -> bool {
    matches!(fail_every, Some(n) if n > 0 && account.id % n == 0)
}

#[derive(Debug, Clone, Default)]
pub struct SimulatedCollection {
    pub latency: Duration,
    pub fail_every: Option<u32>,
}

impl SimulatedCollection {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            fail_every: None,
        }
    }

    pub fn with_fail_every(mut self, fail_every: Option<u32>) -> Self {
        self.fail_every = fail_every;
        self
    }
}

impl CollectionSystem for SimulatedCollection {
    fn collect(&self, account: &BankAccount) -> bool {
        if !self.latency.is_zero() {
            thread::sleep(self.latency);
        }
        let ok = !fails(self.fail_every, account);
        debug!(account = %account.number, ok, "Inkasso done");
        ok
    }
}

#[derive(Debug, Default)]
pub struct SimulatedPrinter {
    pub latency: Duration,
    pub fail_every: Option<u32>,
    printed: AtomicU64,
}

impl SimulatedPrinter {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            fail_every: None,
            printed: AtomicU64::new(0),
        }
    }

    pub fn with_fail_every(mut self, fail_every: Option<u32>) -> Self {
        self.fail_every = fail_every;
        self
    }

    /// Confirmations this printer has produced so far.
    pub fn print_count(&self) -> u64 {
        self.printed.load(Ordering::Relaxed)
    }
}

impl PrintSystem for SimulatedPrinter {
    fn print_confirmation(
        &self,
        bank_name: &str,
        account: &BankAccount,
        holder_name: &str,
    ) -> bool {
        if !self.latency.is_zero() {
            thread::sleep(self.latency);
        }
        if fails(self.fail_every, account) {
            return false;
        }
        self.printed.fetch_add(1, Ordering::Relaxed);
        debug!(
            holder = holder_name,
            account = %account.number,
            bank = bank_name,
            "Printed confirmation"
        );
        true
    }
}
