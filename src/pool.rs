//! The pair pool engine.
//!
//! A [`Pool`] is a pool record plus the address that holds its reserves. Each
//! operation reads reserves and share supply live, runs every guard, and only
//! then moves funds, so a failed guard never leaves a partial effect.

use solana_program::{
    msg,
    program_error::ProgramError,
    pubkey::Pubkey,
};

use crate::{
    error::AmmError,
    event::AmmEvent,
    ledger::{AssetLedger, ShareLedger},
    math,
    state::LiquidityPool,
};

/// Which side of the pool a trade enters on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    AToB,
    BToA,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deposit {
    pub used_a: u64,
    pub used_b: u64,
    pub minted_shares: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Withdrawal {
    pub out_a: u64,
    pub out_b: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Swap {
    pub direction: Direction,
    pub amount_in: u64,
    pub amount_out: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct Pool<'a> {
    key: Pubkey,
    state: &'a LiquidityPool,
}

impl<'a> Pool<'a> {
    pub fn new(key: Pubkey, state: &'a LiquidityPool) -> Self {
        Self { key, state }
    }

    pub fn key(&self) -> &Pubkey {
        &self.key
    }

    pub fn state(&self) -> &LiquidityPool {
        self.state
    }

    pub fn direction(&self, from: &Pubkey, to: &Pubkey) -> Result<Direction, ProgramError> {
        if from == to {
            return Err(AmmError::IdenticalAssets.into());
        }

        if *from == self.state.asset_a && *to == self.state.asset_b {
            Ok(Direction::AToB)
        } else if *from == self.state.asset_b && *to == self.state.asset_a {
            Ok(Direction::BToA)
        } else {
            Err(AmmError::AssetNotInPool.into())
        }
    }

    /// Live `(reserve_a, reserve_b)`.
    pub fn reserves<L: AssetLedger>(&self, ledger: &L) -> Result<(u64, u64), ProgramError> {
        Ok((
            ledger.balance_of(&self.state.asset_a, &self.key)?,
            ledger.balance_of(&self.state.asset_b, &self.key)?,
        ))
    }

    pub fn share_supply<L: ShareLedger>(&self, ledger: &L) -> Result<u64, ProgramError> {
        ledger.total_supply(&self.state.share_mint)
    }

    fn assets(&self, direction: Direction) -> (&Pubkey, &Pubkey) {
        match direction {
            Direction::AToB => (&self.state.asset_a, &self.state.asset_b),
            Direction::BToA => (&self.state.asset_b, &self.state.asset_a),
        }
    }

    /// Pulls the ratio-matched part of `(want_a, want_b)` from `depositor`
    /// and mints shares to it.
    ///
    /// The emitted record names `depositor`. Behind a [`Router`] that is the
    /// router's custody address, not the end user.
    ///
    /// [`Router`]: crate::router::Router
    pub fn deposit<L: AssetLedger + ShareLedger>(
        &self,
        ledger: &mut L,
        depositor: &Pubkey,
        want_a: u64,
        want_b: u64,
        min_shares: u64,
    ) -> Result<Deposit, ProgramError> {
        let (reserve_a, reserve_b) = self.reserves(ledger)?;
        let supply = self.share_supply(ledger)?;

        let quote = math::quote_deposit(reserve_a, reserve_b, supply, want_a, want_b)?;

        if quote.minted_shares < min_shares {
            msg!("minted {} shares, wanted at least {}", quote.minted_shares, min_shares);
            return Err(AmmError::SlippageExceeded.into());
        }

        ledger.transfer_from(&self.state.asset_a, &self.key, depositor, &self.key, quote.used_a)?;
        ledger.transfer_from(&self.state.asset_b, &self.key, depositor, &self.key, quote.used_b)?;
        ledger.mint(&self.state.share_mint, depositor, quote.minted_shares)?;

        AmmEvent::Deposit {
            sender: *depositor,
            amount_a: quote.used_a,
            amount_b: quote.used_b,
            minted_shares: quote.minted_shares,
        }
        .emit()?;

        Ok(Deposit {
            used_a: quote.used_a,
            used_b: quote.used_b,
            minted_shares: quote.minted_shares,
        })
    }

    /// Burns `burn_shares` of `holder` and pays out its proportional claim.
    /// As with [`Pool::deposit`], the record's sender is the custodian when
    /// called through a router.
    pub fn withdraw<L: AssetLedger + ShareLedger>(
        &self,
        ledger: &mut L,
        holder: &Pubkey,
        burn_shares: u64,
        min_a: u64,
        min_b: u64,
    ) -> Result<Withdrawal, ProgramError> {
        if burn_shares == 0 {
            return Err(AmmError::ZeroAmount.into());
        }

        if ledger.shares_of(&self.state.share_mint, holder)? < burn_shares {
            return Err(AmmError::InsufficientShares.into());
        }

        let (reserve_a, reserve_b) = self.reserves(ledger)?;
        let supply = self.share_supply(ledger)?;

        let quote = math::quote_withdraw(reserve_a, reserve_b, supply, burn_shares)?;

        if quote.out_a < min_a || quote.out_b < min_b {
            msg!("withdrawal of {}/{} is below the {}/{} minimum", quote.out_a, quote.out_b, min_a, min_b);
            return Err(AmmError::SlippageExceeded.into());
        }

        ledger.burn(&self.state.share_mint, holder, burn_shares)?;
        ledger.transfer(&self.state.asset_a, &self.key, holder, quote.out_a)?;
        ledger.transfer(&self.state.asset_b, &self.key, holder, quote.out_b)?;

        AmmEvent::Withdraw {
            sender: *holder,
            amount_a: quote.out_a,
            amount_b: quote.out_b,
            burned_shares: burn_shares,
        }
        .emit()?;

        Ok(Withdrawal {
            out_a: quote.out_a,
            out_b: quote.out_b,
        })
    }

    pub fn swap_exact_input<L: AssetLedger>(
        &self,
        ledger: &mut L,
        trader: &Pubkey,
        from: &Pubkey,
        to: &Pubkey,
        amount_in: u64,
        min_amount_out: u64,
    ) -> Result<Swap, ProgramError> {
        let direction = self.direction(from, to)?;
        let (reserve_in, reserve_out) = self.oriented_reserves(ledger, direction)?;

        let amount_out = math::quote_exact_input(
            reserve_in,
            reserve_out,
            amount_in,
            self.state.fee_rate,
            self.state.max_swap_fraction,
        )?;

        if amount_out < min_amount_out {
            msg!("swap output {} is below the {} minimum", amount_out, min_amount_out);
            return Err(AmmError::SlippageExceeded.into());
        }

        self.settle(ledger, trader, direction, amount_in, amount_out)
    }

    pub fn swap_exact_output<L: AssetLedger>(
        &self,
        ledger: &mut L,
        trader: &Pubkey,
        from: &Pubkey,
        to: &Pubkey,
        max_amount_in: u64,
        amount_out: u64,
    ) -> Result<Swap, ProgramError> {
        let direction = self.direction(from, to)?;
        let (reserve_in, reserve_out) = self.oriented_reserves(ledger, direction)?;

        let amount_in = math::quote_exact_output(
            reserve_in,
            reserve_out,
            amount_out,
            self.state.fee_rate,
            self.state.max_swap_fraction,
        )?;

        if amount_in > max_amount_in {
            msg!("swap input {} is above the {} maximum", amount_in, max_amount_in);
            return Err(AmmError::SlippageExceeded.into());
        }

        self.settle(ledger, trader, direction, amount_in, amount_out)
    }

    fn oriented_reserves<L: AssetLedger>(
        &self,
        ledger: &L,
        direction: Direction,
    ) -> Result<(u64, u64), ProgramError> {
        let (reserve_a, reserve_b) = self.reserves(ledger)?;

        Ok(match direction {
            Direction::AToB => (reserve_a, reserve_b),
            Direction::BToA => (reserve_b, reserve_a),
        })
    }

    fn settle<L: AssetLedger>(
        &self,
        ledger: &mut L,
        trader: &Pubkey,
        direction: Direction,
        amount_in: u64,
        amount_out: u64,
    ) -> Result<Swap, ProgramError> {
        let (asset_in, asset_out) = self.assets(direction);

        ledger.transfer_from(asset_in, &self.key, trader, &self.key, amount_in)?;
        ledger.transfer(asset_out, &self.key, trader, amount_out)?;

        Ok(Swap {
            direction,
            amount_in,
            amount_out,
        })
    }
}
