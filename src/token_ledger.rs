//! SPL token implementation of the ledger seams.
//!
//! Every balance is read straight out of the token account data, so reserves
//! reflect the vaults exactly, including transfers made by earlier CPIs in the
//! same instruction. Movements are CPIs into the token program, signed either
//! by the holder (a transaction signer) or by the pool PDA.

use solana_program::{
    account_info::AccountInfo,
    entrypoint::ProgramResult,
    instruction::Instruction,
    program::{invoke, invoke_signed},
    program_error::ProgramError,
    program_pack::Pack,
    pubkey::Pubkey,
};

use spl_token::{
    id as token_program_id,
    instruction::{burn, mint_to, transfer_checked},
    state::{Account as TokenAccount, Mint},
};

use crate::{
    error::AmmError,
    ledger::{AssetLedger, ShareLedger},
    state::{LiquidityPool, PairKey},
};

/// A token account for `mint` owned by `owner`.
pub struct Holding<'a, 'info> {
    pub mint: &'a AccountInfo<'info>,
    pub owner: &'a AccountInfo<'info>,
    pub account: &'a AccountInfo<'info>,
}

pub struct TokenLedger<'a, 'info> {
    token_program: &'a AccountInfo<'info>,
    pool: &'a AccountInfo<'info>,
    pair: PairKey,
    bump: [u8; 1],
    holdings: Vec<Holding<'a, 'info>>,
}

impl<'a, 'info> TokenLedger<'a, 'info> {
    pub fn new(
        token_program: &'a AccountInfo<'info>,
        pool: &'a AccountInfo<'info>,
        pair: PairKey,
        bump: u8,
    ) -> Result<Self, ProgramError> {
        if *token_program.key != token_program_id() {
            return Err(ProgramError::IncorrectProgramId);
        }

        Ok(Self {
            token_program,
            pool,
            pair,
            bump: [bump],
            holdings: Vec::new(),
        })
    }

    /// Registers `account` as `owner`'s token account for `mint`.
    pub fn hold(
        mut self,
        mint: &'a AccountInfo<'info>,
        owner: &'a AccountInfo<'info>,
        account: &'a AccountInfo<'info>,
    ) -> Result<Self, ProgramError> {
        if account.owner != self.token_program.key {
            return Err(AmmError::TokenAccountMismatch.into());
        }

        let account_data = TokenAccount::unpack(&account.data.borrow())?;

        if account_data.mint != *mint.key || account_data.owner != *owner.key {
            return Err(AmmError::TokenAccountMismatch.into());
        }

        self.holdings.push(Holding { mint, owner, account });

        Ok(self)
    }

    fn holding(&self, mint: &Pubkey, owner: &Pubkey) -> Result<&Holding<'a, 'info>, ProgramError> {
        self.holdings
            .iter()
            .find(|holding| holding.mint.key == mint && holding.owner.key == owner)
            .ok_or_else(|| AmmError::TokenAccountMismatch.into())
    }

    fn amount(holding: &Holding<'a, 'info>) -> Result<u64, ProgramError> {
        Ok(TokenAccount::unpack(&holding.account.data.borrow())?.amount)
    }

    fn can_sign(&self, authority: &AccountInfo<'info>) -> bool {
        authority.key == self.pool.key || authority.is_signer
    }

    /// Invokes `instruction` with `authority` as the signing owner.
    fn invoke_as(
        &self,
        instruction: &Instruction,
        account_infos: &[AccountInfo<'info>],
        authority: &AccountInfo<'info>,
    ) -> ProgramResult {
        if authority.key == self.pool.key {
            invoke_signed(
                instruction,
                account_infos,
                &[
                    &[LiquidityPool::SEED_PREFIX, self.pair.lo().as_ref(), self.pair.hi().as_ref(), &self.bump],
                ],
            )
        } else if authority.is_signer {
            invoke(instruction, account_infos)
        } else {
            Err(AmmError::InsufficientAuthorization.into())
        }
    }

    fn move_tokens(&self, mint: &Pubkey, owner: &Pubkey, recipient: &Pubkey, amount: u64) -> ProgramResult {
        let source = self.holding(mint, owner)?;
        let destination = self.holding(mint, recipient)?;

        if !self.can_sign(source.owner) {
            return Err(AmmError::InsufficientAuthorization.into());
        }

        if Self::amount(source)? < amount {
            return Err(AmmError::InsufficientBalance.into());
        }

        let decimals = Mint::unpack(&source.mint.data.borrow())?.decimals;

        self.invoke_as(
            &transfer_checked(
                self.token_program.key,
                source.account.key,
                source.mint.key,
                destination.account.key,
                source.owner.key,
                &[],
                amount,
                decimals,
            )?,
            &[
                source.account.clone(),
                source.mint.clone(),
                destination.account.clone(),
                source.owner.clone(),
                self.token_program.clone(),
            ],
            source.owner,
        )
    }
}

impl AssetLedger for TokenLedger<'_, '_> {
    fn balance_of(&self, asset: &Pubkey, holder: &Pubkey) -> Result<u64, ProgramError> {
        Self::amount(self.holding(asset, holder)?)
    }

    // A holder authorizes by signing the transaction; the pool by its seeds.
    fn transfer_from(
        &mut self,
        asset: &Pubkey,
        _spender: &Pubkey,
        owner: &Pubkey,
        recipient: &Pubkey,
        amount: u64,
    ) -> ProgramResult {
        self.move_tokens(asset, owner, recipient, amount)
    }

    fn transfer(
        &mut self,
        asset: &Pubkey,
        sender: &Pubkey,
        recipient: &Pubkey,
        amount: u64,
    ) -> ProgramResult {
        self.move_tokens(asset, sender, recipient, amount)
    }
}

impl ShareLedger for TokenLedger<'_, '_> {
    fn total_supply(&self, share: &Pubkey) -> Result<u64, ProgramError> {
        let mint = self
            .holdings
            .iter()
            .find(|holding| holding.mint.key == share)
            .map(|holding| holding.mint)
            .ok_or(AmmError::LpMintAddressMismatch)?;

        Ok(Mint::unpack(&mint.data.borrow())?.supply)
    }

    fn shares_of(&self, share: &Pubkey, holder: &Pubkey) -> Result<u64, ProgramError> {
        self.balance_of(share, holder)
    }

    fn mint(&mut self, share: &Pubkey, holder: &Pubkey, amount: u64) -> ProgramResult {
        let destination = self.holding(share, holder)?;

        self.invoke_as(
            &mint_to(
                self.token_program.key,
                destination.mint.key,
                destination.account.key,
                self.pool.key,
                &[],
                amount,
            )?,
            &[
                destination.mint.clone(),
                destination.account.clone(),
                self.pool.clone(),
                self.token_program.clone(),
            ],
            self.pool,
        )
    }

    fn burn(&mut self, share: &Pubkey, holder: &Pubkey, amount: u64) -> ProgramResult {
        let source = self.holding(share, holder)?;

        if Self::amount(source)? < amount {
            return Err(AmmError::InsufficientShares.into());
        }

        self.invoke_as(
            &burn(
                self.token_program.key,
                source.account.key,
                source.mint.key,
                source.owner.key,
                &[],
                amount,
            )?,
            &[
                source.account.clone(),
                source.mint.clone(),
                source.owner.clone(),
                self.token_program.clone(),
            ],
            source.owner,
        )
    }
}
