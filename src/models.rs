use serde::Serialize;

/// An inkasso contract. Holds an optional link to the account it is collected from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Contract {
    pub id: u32,
    pub bank_account_id: Option<u32>,
    pub policy_holder_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BankAccount {
    pub id: u32,
    pub bank_id: u32,
    pub number: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bank {
    pub id: u32,
    pub name: String,
}

/// Everything the print stage needs for one confirmation, copied out of the
/// source collections so no borrow outlives the enqueue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintJob {
    pub bank_name: String,
    pub account: BankAccount,
    pub holder_name: String,
}

impl PrintJob {
    pub fn new(bank: &Bank, account: &BankAccount, contract: &Contract) -> Self {
        Self {
            bank_name: bank.name.clone(),
            account: account.clone(),
            holder_name: contract.policy_holder_name.clone(),
        }
    }
}
