//! In-process router: a registry of pair pools over a single ledger.
//!
//! The router owns custody of its own address. Callers authorise the router
//! over their assets; the router stages funds into its custody, calls the
//! pool as the depositor/trader, and forwards outputs and unused inputs back.
//! Pools are authorised over the router's custody with an unlimited
//! allowance when they are created.

use std::collections::BTreeMap;

use solana_program::{
    msg,
    program_error::ProgramError,
    pubkey::Pubkey,
};

use crate::{
    error::AmmError,
    event::AmmEvent,
    ledger::{Allowance, AssetLedger, ShareLedger, UNLIMITED},
    pool::{Deposit, Pool, Swap, Withdrawal},
    state::{LiquidityPool, PairKey},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolEntry {
    pub key: Pubkey,
    pub state: LiquidityPool,
}

impl PoolEntry {
    pub fn pool(&self) -> Pool<'_> {
        Pool::new(self.key, &self.state)
    }

    /// Whether the caller's `asset_a` is the pool's `asset_a`.
    fn is_aligned(&self, asset_a: &Pubkey) -> bool {
        *asset_a == self.state.asset_a
    }
}

#[derive(Debug, Clone)]
pub struct Router<L> {
    key: Pubkey,
    ledger: L,
    pools: BTreeMap<PairKey, PoolEntry>,
}

impl<L> Router<L>
where
    L: AssetLedger + ShareLedger + Allowance + Clone,
{
    pub fn new(key: Pubkey, ledger: L) -> Self {
        Self {
            key,
            ledger,
            pools: BTreeMap::new(),
        }
    }

    pub fn key(&self) -> &Pubkey {
        &self.key
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    pub fn pool(&self, asset_a: &Pubkey, asset_b: &Pubkey) -> Result<&PoolEntry, ProgramError> {
        self.pools
            .get(&PairKey::new(asset_a, asset_b)?)
            .ok_or_else(|| AmmError::PoolNotFound.into())
    }

    /// Live reserves, in the caller's `(asset_a, asset_b)` order.
    pub fn reserves(&self, asset_a: &Pubkey, asset_b: &Pubkey) -> Result<(u64, u64), ProgramError> {
        let entry = self.pool(asset_a, asset_b)?;
        let (reserve_a, reserve_b) = entry.pool().reserves(&self.ledger)?;

        Ok(orient(entry.is_aligned(asset_a), reserve_a, reserve_b))
    }

    pub fn create_pool(
        &mut self,
        asset_a: &Pubkey,
        asset_b: &Pubkey,
        fee_rate: u8,
        max_swap_fraction: u8,
        share_name: &str,
    ) -> Result<Pubkey, ProgramError> {
        let pair = PairKey::new(asset_a, asset_b)?;

        if self.pools.contains_key(&pair) {
            return Err(AmmError::PoolExists.into());
        }

        let (pool_key, bump) = pair.find_pool_address(&self.key);
        let (share_mint, _) = LiquidityPool::find_share_mint_address(&pool_key, &self.key);

        let state = LiquidityPool::new(
            *asset_a,
            *asset_b,
            share_mint,
            fee_rate,
            max_swap_fraction,
            bump,
            share_name.to_string(),
        )?;

        self.atomically(|router| {
            router.ledger.approve(asset_a, &router.key, &pool_key, UNLIMITED)?;
            router.ledger.approve(asset_b, &router.key, &pool_key, UNLIMITED)?;

            AmmEvent::PoolCreated {
                asset_a: *asset_a,
                asset_b: *asset_b,
                pool: pool_key,
            }
            .emit()
        })?;

        msg!("created pool {} for {}/{}", pool_key, asset_a, asset_b);
        self.pools.insert(pair, PoolEntry { key: pool_key, state });

        Ok(pool_key)
    }

    /// Amounts and result are in the caller's `(asset_a, asset_b)` order.
    pub fn deposit(
        &mut self,
        sender: &Pubkey,
        asset_a: &Pubkey,
        asset_b: &Pubkey,
        want_a: u64,
        want_b: u64,
        min_shares: u64,
    ) -> Result<Deposit, ProgramError> {
        let entry = self.pool(asset_a, asset_b)?.clone();
        let aligned = entry.is_aligned(asset_a);

        self.atomically(|router| {
            router.stage(asset_a, sender, want_a)?;
            router.stage(asset_b, sender, want_b)?;

            let (pool_want_a, pool_want_b) = orient(aligned, want_a, want_b);
            let deposit = entry
                .pool()
                .deposit(&mut router.ledger, &router.key, pool_want_a, pool_want_b, min_shares)?;
            let (used_a, used_b) = orient(aligned, deposit.used_a, deposit.used_b);

            router.forward(&entry.state.share_mint, sender, deposit.minted_shares)?;
            router.forward(asset_a, sender, want_a - used_a)?;
            router.forward(asset_b, sender, want_b - used_b)?;

            Ok(Deposit {
                used_a,
                used_b,
                minted_shares: deposit.minted_shares,
            })
        })
    }

    pub fn withdraw(
        &mut self,
        sender: &Pubkey,
        asset_a: &Pubkey,
        asset_b: &Pubkey,
        burn_shares: u64,
        min_a: u64,
        min_b: u64,
    ) -> Result<Withdrawal, ProgramError> {
        let entry = self.pool(asset_a, asset_b)?.clone();
        let aligned = entry.is_aligned(asset_a);

        if self.ledger.shares_of(&entry.state.share_mint, sender)? < burn_shares {
            return Err(AmmError::InsufficientShares.into());
        }

        self.atomically(|router| {
            router.stage(&entry.state.share_mint, sender, burn_shares)?;

            let (pool_min_a, pool_min_b) = orient(aligned, min_a, min_b);
            let withdrawal = entry
                .pool()
                .withdraw(&mut router.ledger, &router.key, burn_shares, pool_min_a, pool_min_b)?;
            let (out_a, out_b) = orient(aligned, withdrawal.out_a, withdrawal.out_b);

            router.forward(asset_a, sender, out_a)?;
            router.forward(asset_b, sender, out_b)?;

            Ok(Withdrawal { out_a, out_b })
        })
    }

    pub fn swap_exact_input(
        &mut self,
        sender: &Pubkey,
        asset_in: &Pubkey,
        asset_out: &Pubkey,
        amount_in: u64,
        min_amount_out: u64,
    ) -> Result<Swap, ProgramError> {
        let entry = self.pool(asset_in, asset_out)?.clone();

        self.atomically(|router| {
            router.stage(asset_in, sender, amount_in)?;

            let swap = entry.pool().swap_exact_input(
                &mut router.ledger,
                &router.key,
                asset_in,
                asset_out,
                amount_in,
                min_amount_out,
            )?;

            router.forward(asset_out, sender, swap.amount_out)?;
            emit_swap(sender, asset_in, asset_out, &swap)?;

            Ok(swap)
        })
    }

    pub fn swap_exact_output(
        &mut self,
        sender: &Pubkey,
        asset_in: &Pubkey,
        asset_out: &Pubkey,
        max_amount_in: u64,
        amount_out: u64,
    ) -> Result<Swap, ProgramError> {
        let entry = self.pool(asset_in, asset_out)?.clone();

        self.atomically(|router| {
            router.stage(asset_in, sender, max_amount_in)?;

            let swap = entry.pool().swap_exact_output(
                &mut router.ledger,
                &router.key,
                asset_in,
                asset_out,
                max_amount_in,
                amount_out,
            )?;

            router.forward(asset_out, sender, swap.amount_out)?;
            router.forward(asset_in, sender, max_amount_in - swap.amount_in)?;
            emit_swap(sender, asset_in, asset_out, &swap)?;

            Ok(swap)
        })
    }

    /// Runs `operation` against the ledger, restoring it if the operation fails.
    ///
    /// The snapshot is a clone of the whole ledger, so each call costs time
    /// linear in the ledger's size. That is acceptable for the in-process host.
    fn atomically<T>(
        &mut self,
        operation: impl FnOnce(&mut Self) -> Result<T, ProgramError>,
    ) -> Result<T, ProgramError> {
        let snapshot = self.ledger.clone();

        let result = operation(self);

        if result.is_err() {
            self.ledger = snapshot;
        }

        result
    }

    fn stage(&mut self, asset: &Pubkey, sender: &Pubkey, amount: u64) -> Result<(), ProgramError> {
        self.ledger.transfer_from(asset, &self.key, sender, &self.key, amount)
    }

    fn forward(&mut self, asset: &Pubkey, recipient: &Pubkey, amount: u64) -> Result<(), ProgramError> {
        if amount == 0 {
            return Ok(());
        }

        self.ledger.transfer(asset, &self.key, recipient, amount)
    }
}

fn orient(aligned: bool, a: u64, b: u64) -> (u64, u64) {
    if aligned {
        (a, b)
    } else {
        (b, a)
    }
}

fn emit_swap(sender: &Pubkey, asset_in: &Pubkey, asset_out: &Pubkey, swap: &Swap) -> Result<(), ProgramError> {
    AmmEvent::Swap {
        sender: *sender,
        asset_in: *asset_in,
        asset_out: *asset_out,
        amount_in: swap.amount_in,
        amount_out: swap.amount_out,
    }
    .emit()
}
