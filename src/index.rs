use crate::models::{Bank, BankAccount, Contract};
use rustc_hash::FxHashMap;
use tracing::info;

/// Bulk read of a collaborator's entities, taken once before the pipeline starts.
pub trait Snapshot<T> {
    fn snapshot_all(&self) -> Vec<T>;
}

/// Id-keyed lookups over the reference data.
///
/// Built single-threaded before any worker starts and never mutated
/// afterwards, so it can be shared by reference across the batch threads.
pub struct LookupIndex {
    accounts: FxHashMap<u32, BankAccount>,
    banks: FxHashMap<u32, Bank>,
    contracts: FxHashMap<u32, Contract>,
}

impl LookupIndex {
    /// On duplicate ids the last entry wins.
    pub fn build(contracts: &[Contract], accounts: &[BankAccount], banks: &[Bank]) -> Self {
        let mut account_map =
            FxHashMap::with_capacity_and_hasher(accounts.len(), Default::default());
        for account in accounts {
            account_map.insert(account.id, account.clone());
        }

        let mut bank_map = FxHashMap::with_capacity_and_hasher(banks.len(), Default::default());
        for bank in banks {
            bank_map.insert(bank.id, bank.clone());
        }

        let mut contract_map =
            FxHashMap::with_capacity_and_hasher(contracts.len(), Default::default());
        for contract in contracts {
            contract_map.insert(contract.id, contract.clone());
        }

        info!(
            contracts = contract_map.len(),
            accounts = account_map.len(),
            banks = bank_map.len(),
            "Lookup index built"
        );

        Self {
            accounts: account_map,
            banks: bank_map,
            contracts: contract_map,
        }
    }

    pub fn from_source<S>(source: &S) -> Self
    where
        S: Snapshot<Contract> + Snapshot<BankAccount> + Snapshot<Bank>,
    {
        let contracts: Vec<Contract> = source.snapshot_all();
        let accounts: Vec<BankAccount> = source.snapshot_all();
        let banks: Vec<Bank> = source.snapshot_all();
        Self::build(&contracts, &accounts, &banks)
    }

    pub fn account_by_id(&self, id: u32) -> Option<&BankAccount> {
        self.accounts.get(&id)
    }

    pub fn bank_by_id(&self, id: u32) -> Option<&Bank> {
        self.banks.get(&id)
    }

    pub fn contract_by_id(&self, id: u32) -> Option<&Contract> {
        self.contracts.get(&id)
    }

    /// Account for a contract, if it links one that exists.
    pub fn account_for(&self, contract: &Contract) -> Option<&BankAccount> {
        contract
            .bank_account_id
            .and_then(|id| self.account_by_id(id))
    }

    /// Number of contracts the batch stage will attempt to collect.
    pub fn contracts_with_accounts(&self, contracts: &[Contract]) -> u64 {
        contracts
            .iter()
            .filter(|c| self.account_for(c).is_some())
            .count() as u64
    }

    /// (contracts, accounts, banks)
    pub fn stats(&self) -> (usize, usize, usize) {
        (self.contracts.len(), self.accounts.len(), self.banks.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(id: u32, bank_id: u32) -> BankAccount {
        BankAccount {
            id,
            bank_id,
            number: format!("ACC-{id}"),
        }
    }

    fn bank(id: u32, name: &str) -> Bank {
        Bank {
            id,
            name: name.to_string(),
        }
    }

    fn contract(id: u32, account: Option<u32>) -> Contract {
        Contract {
            id,
            bank_account_id: account,
            policy_holder_name: format!("Holder {id}"),
        }
    }

    #[test]
    fn account_by_id_present_and_absent() {
        let accounts: Vec<_> = (1..=500).map(|i| account(i, 1)).collect();
        let index = LookupIndex::build(&[], &accounts, &[]);

        for acc in &accounts {
            assert_eq!(index.account_by_id(acc.id), Some(acc));
        }
        assert_eq!(index.account_by_id(0), None);
        assert_eq!(index.account_by_id(501), None);
    }

    #[test]
    fn bank_and_contract_lookup() {
        let banks = vec![bank(1, "Sparkasse"), bank(2, "Volksbank")];
        let contracts = vec![contract(10, Some(1)), contract(11, None)];
        let index = LookupIndex::build(&contracts, &[], &banks);

        assert_eq!(index.bank_by_id(2).map(|b| b.name.as_str()), Some("Volksbank"));
        assert_eq!(index.bank_by_id(3), None);
        assert_eq!(index.contract_by_id(11), Some(&contracts[1]));
        assert_eq!(index.contract_by_id(12), None);
    }

    #[test]
    fn account_for_contract() {
        let accounts = vec![account(1, 1)];
        let index = LookupIndex::build(&[], &accounts, &[]);

        assert_eq!(index.account_for(&contract(1, Some(1))), Some(&accounts[0]));
        assert_eq!(index.account_for(&contract(2, Some(9))), None);
        assert_eq!(index.account_for(&contract(3, None)), None);
    }

    #[test]
    fn duplicate_ids_last_wins() {
        let accounts = vec![account(1, 1), account(1, 2)];
        let index = LookupIndex::build(&[], &accounts, &[]);
        assert_eq!(index.account_by_id(1).map(|a| a.bank_id), Some(2));
        assert_eq!(index.stats(), (0, 1, 0));
    }

    #[test]
    fn rebuild_is_idempotent() {
        let contracts: Vec<_> = (1..=20).map(|i| contract(i, Some(i % 7))).collect();
        let accounts: Vec<_> = (1..=6).map(|i| account(i, i % 3)).collect();
        let banks = vec![bank(1, "A"), bank(2, "B")];

        let first = LookupIndex::build(&contracts, &accounts, &banks);
        let second = LookupIndex::build(&contracts, &accounts, &banks);

        for id in 0..25 {
            assert_eq!(first.account_by_id(id), second.account_by_id(id));
            assert_eq!(first.bank_by_id(id), second.bank_by_id(id));
            assert_eq!(first.contract_by_id(id), second.contract_by_id(id));
        }
        assert_eq!(first.stats(), second.stats());
    }

    #[test]
    fn contracts_with_accounts_counts_resolvable_links() {
        let contracts = vec![
            contract(1, Some(1)),
            contract(2, Some(2)),
            contract(3, None),
            contract(4, Some(99)),
        ];
        let accounts = vec![account(1, 1), account(2, 1)];
        let index = LookupIndex::build(&contracts, &accounts, &[]);
        assert_eq!(index.contracts_with_accounts(&contracts), 2);
    }

    #[test]
    fn empty_index() {
        let index = LookupIndex::build(&[], &[], &[]);
        assert_eq!(index.stats(), (0, 0, 0));
        assert_eq!(index.account_by_id(1), None);
    }
}
