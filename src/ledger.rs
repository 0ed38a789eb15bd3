//! Collaborator seams of the pool engine.
//!
//! The pool never stores balances. It asks an [`AssetLedger`] for live
//! reserves and moves funds through it, and it keeps ownership in a
//! [`ShareLedger`]. On chain both are SPL token programs (see
//! `token_ledger`); [`MemoryLedger`] is the in-process host used by the
//! router.

use std::collections::HashMap;

use solana_program::{
    entrypoint::ProgramResult,
    program_error::ProgramError,
    pubkey::Pubkey,
};

use crate::error::AmmError;

/// Allowance value that is never decremented.
pub const UNLIMITED: u64 = u64::MAX;

pub trait AssetLedger {
    /// Latest committed balance of `holder` in `asset`.
    fn balance_of(&self, asset: &Pubkey, holder: &Pubkey) -> Result<u64, ProgramError>;

    /// Moves `amount` out of `owner`'s custody on behalf of `spender`.
    fn transfer_from(
        &mut self,
        asset: &Pubkey,
        spender: &Pubkey,
        owner: &Pubkey,
        recipient: &Pubkey,
        amount: u64,
    ) -> ProgramResult;

    /// Moves `amount` out of the sender's own custody.
    fn transfer(
        &mut self,
        asset: &Pubkey,
        sender: &Pubkey,
        recipient: &Pubkey,
        amount: u64,
    ) -> ProgramResult;
}

pub trait ShareLedger {
    fn total_supply(&self, share: &Pubkey) -> Result<u64, ProgramError>;

    fn shares_of(&self, share: &Pubkey, holder: &Pubkey) -> Result<u64, ProgramError>;

    fn mint(&mut self, share: &Pubkey, holder: &Pubkey, amount: u64) -> ProgramResult;

    fn burn(&mut self, share: &Pubkey, holder: &Pubkey, amount: u64) -> ProgramResult;
}

pub trait Allowance {
    fn approve(&mut self, asset: &Pubkey, owner: &Pubkey, spender: &Pubkey, amount: u64) -> ProgramResult;

    fn allowance(&self, asset: &Pubkey, owner: &Pubkey, spender: &Pubkey) -> u64;
}

/// Fungible balances, supplies and allowances held in memory.
///
/// Shares are ordinary assets here: a pool's share mint is just another key,
/// so shares can be transferred like any other asset.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    balances: HashMap<(Pubkey, Pubkey), u64>,
    supplies: HashMap<Pubkey, u64>,
    allowances: HashMap<(Pubkey, Pubkey, Pubkey), u64>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues new units of `asset` to `holder`, growing its supply.
    pub fn issue(&mut self, asset: &Pubkey, holder: &Pubkey, amount: u64) -> ProgramResult {
        let supply = self.supplies.entry(*asset).or_default();
        *supply = supply.checked_add(amount).ok_or(ProgramError::ArithmeticOverflow)?;

        self.credit(asset, holder, amount)
    }

    fn credit(&mut self, asset: &Pubkey, holder: &Pubkey, amount: u64) -> ProgramResult {
        let balance = self.balances.entry((*asset, *holder)).or_default();
        *balance = balance.checked_add(amount).ok_or(ProgramError::ArithmeticOverflow)?;

        Ok(())
    }

    fn debit(&mut self, asset: &Pubkey, holder: &Pubkey, amount: u64, shortfall: AmmError) -> ProgramResult {
        let balance = self.balances.entry((*asset, *holder)).or_default();

        if *balance < amount {
            return Err(shortfall.into());
        }

        *balance -= amount;

        Ok(())
    }

    fn check_allowance(&self, asset: &Pubkey, owner: &Pubkey, spender: &Pubkey, amount: u64) -> ProgramResult {
        if owner != spender && self.allowance(asset, owner, spender) < amount {
            return Err(AmmError::InsufficientAuthorization.into());
        }

        Ok(())
    }

    fn spend_allowance(&mut self, asset: &Pubkey, owner: &Pubkey, spender: &Pubkey, amount: u64) {
        if owner == spender {
            return;
        }

        if let Some(allowance) = self.allowances.get_mut(&(*asset, *owner, *spender)) {
            if *allowance != UNLIMITED {
                *allowance = allowance.saturating_sub(amount);
            }
        }
    }
}

impl AssetLedger for MemoryLedger {
    fn balance_of(&self, asset: &Pubkey, holder: &Pubkey) -> Result<u64, ProgramError> {
        Ok(self.balances.get(&(*asset, *holder)).copied().unwrap_or(0))
    }

    fn transfer_from(
        &mut self,
        asset: &Pubkey,
        spender: &Pubkey,
        owner: &Pubkey,
        recipient: &Pubkey,
        amount: u64,
    ) -> ProgramResult {
        self.check_allowance(asset, owner, spender, amount)?;
        self.transfer(asset, owner, recipient, amount)?;
        self.spend_allowance(asset, owner, spender, amount);

        Ok(())
    }

    fn transfer(
        &mut self,
        asset: &Pubkey,
        sender: &Pubkey,
        recipient: &Pubkey,
        amount: u64,
    ) -> ProgramResult {
        self.debit(asset, sender, amount, AmmError::InsufficientBalance)?;
        self.credit(asset, recipient, amount)
    }
}

impl ShareLedger for MemoryLedger {
    fn total_supply(&self, share: &Pubkey) -> Result<u64, ProgramError> {
        Ok(self.supplies.get(share).copied().unwrap_or(0))
    }

    fn shares_of(&self, share: &Pubkey, holder: &Pubkey) -> Result<u64, ProgramError> {
        self.balance_of(share, holder)
    }

    fn mint(&mut self, share: &Pubkey, holder: &Pubkey, amount: u64) -> ProgramResult {
        self.issue(share, holder, amount)
    }

    fn burn(&mut self, share: &Pubkey, holder: &Pubkey, amount: u64) -> ProgramResult {
        self.debit(share, holder, amount, AmmError::InsufficientShares)?;

        let supply = self.supplies.entry(*share).or_default();
        *supply = supply.checked_sub(amount).ok_or(ProgramError::ArithmeticOverflow)?;

        Ok(())
    }
}

impl Allowance for MemoryLedger {
    fn approve(&mut self, asset: &Pubkey, owner: &Pubkey, spender: &Pubkey, amount: u64) -> ProgramResult {
        self.allowances.insert((*asset, *owner, *spender), amount);

        Ok(())
    }

    fn allowance(&self, asset: &Pubkey, owner: &Pubkey, spender: &Pubkey) -> u64 {
        self.allowances.get(&(*asset, *owner, *spender)).copied().unwrap_or(0)
    }
}
