use solana_program::{
    entrypoint::ProgramResult,
    log::sol_log_data,
    msg,
    pubkey::Pubkey,
};

use borsh::{BorshSerialize, BorshDeserialize};

/// Records emitted for indexers. They carry no weight for correctness.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub enum AmmEvent {
    PoolCreated {
        asset_a: Pubkey,
        asset_b: Pubkey,
        pool: Pubkey,
    },
    Deposit {
        sender: Pubkey,
        amount_a: u64,
        amount_b: u64,
        minted_shares: u64,
    },
    Withdraw {
        sender: Pubkey,
        amount_a: u64,
        amount_b: u64,
        burned_shares: u64,
    },
    Swap {
        sender: Pubkey,
        asset_in: Pubkey,
        asset_out: Pubkey,
        amount_in: u64,
        amount_out: u64,
    },
}

impl AmmEvent {
    pub fn emit(&self) -> ProgramResult {
        msg!("{:?}", self);

        let data = borsh::to_vec(self)?;
        sol_log_data(&[&data]);

        Ok(())
    }
}
