//! Deterministic synthetic reference data: contracts, bank accounts and banks.
//!
//! The same [`DataSetConfig`] always produces the same data, so runs can be
//! compared against each other. Every generated account points at an existing
//! bank; whether a contract links an account is decided by `account_ratio`.

use crate::index::Snapshot;
use crate::models::{Bank, BankAccount, Contract};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::info;

const HOLDER_FIRST_NAMES: &[&str] = &[
    "Anna", "Ben", "Clara", "David", "Emma", "Felix", "Greta", "Hannes", "Ida", "Jonas", "Lena",
    "Moritz",
];

const HOLDER_LAST_NAMES: &[&str] = &[
    "Müller", "Schmidt", "Schneider", "Fischer", "Weber", "Meyer", "Wagner", "Becker", "Hoffmann",
];

const BANK_NAMES: &[&str] = &[
    "Sparkasse",
    "Volksbank",
    "Commerzbank",
    "Deutsche Bank",
    "Postbank",
    "Raiffeisenbank",
];

/// Spreads consecutive ids over [0, 1000) so the account ratio is honoured
/// without clustering.
const RATIO_STRIDE: u64 = 7919;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataSetConfig {
    pub contracts: u32,
    pub accounts: u32,
    pub banks: u32,
    /// Share of contracts that link a bank account, in `[0.0, 1.0]`.
    pub account_ratio: f64,
}

impl DataSetConfig {
    pub const MINI: Self = Self {
        contracts: 1_000,
        accounts: 600,
        banks: 20,
        account_ratio: 0.6,
    };

    pub const MEDIUM: Self = Self {
        contracts: 20_000,
        accounts: 12_000,
        banks: 100,
        account_ratio: 0.6,
    };

    pub const CHALLENGE: Self = Self {
        contracts: 100_000,
        accounts: 60_000,
        banks: 400,
        account_ratio: 0.6,
    };

    pub fn custom(contracts: u32, accounts: u32, banks: u32, account_ratio: f64) -> Result<Self> {
        let config = Self {
            contracts,
            accounts,
            banks,
            account_ratio,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open dataset config: {}", path.display()))?;
        let config: Self = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse dataset config: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.account_ratio) {
            bail!(
                "account_ratio must be between 0 and 1, got {}",
                self.account_ratio
            );
        }
        if self.accounts > 0 && self.banks == 0 {
            bail!("accounts need at least one bank");
        }
        Ok(())
    }

    fn links_account(&self, contract_id: u32) -> bool {
        let threshold = (self.account_ratio * 1000.0).round() as u64;
        (contract_id as u64 * RATIO_STRIDE) % 1000 < threshold
    }
}

pub struct DataSet {
    contracts: Vec<Contract>,
    accounts: Vec<BankAccount>,
    banks: Vec<Bank>,
}

impl DataSet {
    pub fn generate(config: &DataSetConfig) -> Self {
        let banks: Vec<Bank> = (1..=config.banks)
            .map(|id| Bank {
                id,
                name: format!("{} {}", BANK_NAMES[(id as usize - 1) % BANK_NAMES.len()], id),
            })
            .collect();

        let accounts: Vec<BankAccount> = (1..=config.accounts)
            .map(|id| BankAccount {
                id,
                bank_id: (id - 1) % config.banks.max(1) + 1,
                number: format!("DE{:020}", id as u64 * 104_729),
            })
            .collect();

        let contracts: Vec<Contract> = (1..=config.contracts)
            .map(|id| {
                let bank_account_id = (config.accounts > 0 && config.links_account(id))
                    .then(|| (id - 1) % config.accounts + 1);
                let first = HOLDER_FIRST_NAMES[id as usize % HOLDER_FIRST_NAMES.len()];
                let last = HOLDER_LAST_NAMES[(id as usize / 7) % HOLDER_LAST_NAMES.len()];
                Contract {
                    id,
                    bank_account_id,
                    policy_holder_name: format!("{first} {last}"),
                }
            })
            .collect();

        info!(
            contracts = contracts.len(),
            accounts = accounts.len(),
            banks = banks.len(),
            "Data set generated"
        );

        Self {
            contracts,
            accounts,
            banks,
        }
    }

    /// Build from explicit collections, e.g. fixtures.
    pub fn from_parts(
        contracts: Vec<Contract>,
        accounts: Vec<BankAccount>,
        banks: Vec<Bank>,
    ) -> Self {
        Self {
            contracts,
            accounts,
            banks,
        }
    }

    pub fn contracts(&self) -> &[Contract] {
        &self.contracts
    }

    pub fn accounts(&self) -> &[BankAccount] {
        &self.accounts
    }

    pub fn banks(&self) -> &[Bank] {
        &self.banks
    }

    /// Contracts whose linked account exists; the number of collections a
    /// correct run attempts.
    pub fn contracts_with_accounts_count(&self) -> u64 {
        let account_ids: rustc_hash::FxHashSet<u32> = self.accounts.iter().map(|a| a.id).collect();
        self.contracts
            .iter()
            .filter(|c| {
                c.bank_account_id
                    .is_some_and(|id| account_ids.contains(&id))
            })
            .count() as u64
    }
}

impl Snapshot<Contract> for DataSet {
    fn snapshot_all(&self) -> Vec<Contract> {
        self.contracts.clone()
    }
}

impl Snapshot<BankAccount> for DataSet {
    fn snapshot_all(&self) -> Vec<BankAccount> {
        self.accounts.clone()
    }
}

impl Snapshot<Bank> for DataSet {
    fn snapshot_all(&self) -> Vec<Bank> {
        self.banks.clone()
    }
}
