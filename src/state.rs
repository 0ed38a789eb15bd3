use solana_program::{
    program_error::ProgramError,
    pubkey::Pubkey,
};

use borsh::{BorshSerialize, BorshDeserialize};

use crate::{error::AmmError, math::PERCENT};

/// Configuration of one pair pool. Reserves and share supply are never
/// stored; they are read from the token ledgers on every operation.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct LiquidityPool {
    pub asset_a: Pubkey,
    pub asset_b: Pubkey,
    pub share_mint: Pubkey,
    pub fee_rate: u8,
    pub max_swap_fraction: u8,
    pub bump: u8,
    pub share_name: String,
}

impl LiquidityPool {
    pub const SEED_PREFIX: &'static [u8] = b"pool";
    pub const LP_MINT_SEED_PREFIX: &'static [u8] = b"lp_mint";
    pub const MAX_SHARE_NAME_LEN: usize = 32;
    pub const SHARE_DECIMALS: u8 = 9;

    pub const SPACE: usize =
        32       // asset_a pubkey
        + 32     // asset_b pubkey
        + 32     // share_mint pubkey
        + 1      // fee_rate
        + 1      // max_swap_fraction
        + 1      // bump
        + (4 + Self::MAX_SHARE_NAME_LEN); // share_name

    pub fn new(
        asset_a: Pubkey,
        asset_b: Pubkey,
        share_mint: Pubkey,
        fee_rate: u8,
        max_swap_fraction: u8,
        bump: u8,
        share_name: String,
    ) -> Result<Self, ProgramError> {
        if asset_a == asset_b {
            return Err(AmmError::IdenticalAssets.into());
        }

        if fee_rate as u128 > PERCENT || max_swap_fraction as u128 > PERCENT {
            return Err(AmmError::InvalidPercentage.into());
        }

        if share_name.len() > Self::MAX_SHARE_NAME_LEN {
            return Err(AmmError::ShareNameTooLong.into());
        }

        Ok(Self {
            asset_a,
            asset_b,
            share_mint,
            fee_rate,
            max_swap_fraction,
            bump,
            share_name,
        })
    }

    pub fn pair(&self) -> Result<PairKey, ProgramError> {
        PairKey::new(&self.asset_a, &self.asset_b)
    }

    pub fn find_share_mint_address(pool: &Pubkey, program_id: &Pubkey) -> (Pubkey, u8) {
        Pubkey::find_program_address(&[Self::LP_MINT_SEED_PREFIX, pool.as_ref()], program_id)
    }
}

/// An unordered asset pair, canonicalised so that `(a, b)` and `(b, a)` are
/// the same key.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PairKey {
    lo: Pubkey,
    hi: Pubkey,
}

impl PairKey {
    pub fn new(a: &Pubkey, b: &Pubkey) -> Result<Self, ProgramError> {
        if a == b {
            return Err(AmmError::IdenticalAssets.into());
        }

        let (lo, hi) = if a < b { (*a, *b) } else { (*b, *a) };

        Ok(Self { lo, hi })
    }

    pub fn lo(&self) -> &Pubkey {
        &self.lo
    }

    pub fn hi(&self) -> &Pubkey {
        &self.hi
    }

    pub fn find_pool_address(&self, program_id: &Pubkey) -> (Pubkey, u8) {
        Pubkey::find_program_address(
            &[LiquidityPool::SEED_PREFIX, self.lo.as_ref(), self.hi.as_ref()],
            program_id,
        )
    }

    pub fn create_pool_address(&self, bump: u8, program_id: &Pubkey) -> Result<Pubkey, ProgramError> {
        Pubkey::create_program_address(
            &[LiquidityPool::SEED_PREFIX, self.lo.as_ref(), self.hi.as_ref(), &[bump]],
            program_id,
        )
        .map_err(|_| ProgramError::InvalidSeeds)
    }
}
