use borsh::BorshSerialize;
use solana_program::{
    account_info::{next_account_info, AccountInfo},
    entrypoint::ProgramResult,
    program_error::ProgramError,
    program::{invoke, invoke_signed},
    program_pack::Pack,
    pubkey::Pubkey,
    sysvar::{rent::Rent, Sysvar},
    borsh1::try_from_slice_unchecked,
    msg,
};

use solana_system_interface::{
    program::id as system_program_id,
    instruction::create_account,
};

use spl_associated_token_account::{
    id as associated_token_program_id,
    get_associated_token_address,
    instruction::create_associated_token_account_idempotent,
};
use spl_token::{
    id as token_program_id,
    instruction::initialize_mint2,
    state::Mint,
};

use crate::{
    error::AmmError,
    event::AmmEvent,
    instruction::AmmInstruction,
    pool::Pool,
    state::{LiquidityPool, PairKey},
    token_ledger::TokenLedger,
};

pub fn process_instruction(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    instruction_data: &[u8]
) -> ProgramResult {
    let instruction = AmmInstruction::unpack(instruction_data)?;

    match instruction {
        AmmInstruction::CreatePool { fee_rate, max_swap_fraction, share_name } => {
            process_create_pool(program_id, accounts, fee_rate, max_swap_fraction, share_name)
        },
        AmmInstruction::Deposit { want_a, want_b, min_shares } => {
            process_deposit(program_id, accounts, want_a, want_b, min_shares)
        },
        AmmInstruction::Withdraw { burn_shares, min_a, min_b } => {
            process_withdraw(program_id, accounts, burn_shares, min_a, min_b)
        },
        AmmInstruction::SwapExactInput { amount_in, min_amount_out } => {
            process_swap(program_id, accounts, SwapLimit::ExactInput { amount_in, min_amount_out })
        },
        AmmInstruction::SwapExactOutput { max_amount_in, amount_out } => {
            process_swap(program_id, accounts, SwapLimit::ExactOutput { max_amount_in, amount_out })
        },
    }
}

pub fn process_create_pool(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    fee_rate: u8,
    max_swap_fraction: u8,
    share_name: String,
) -> ProgramResult {
    let accounts_iter = &mut accounts.iter();

    let payer = next_account_info(accounts_iter)?;
    let pool = next_account_info(accounts_iter)?;
    let mint_a = next_account_info(accounts_iter)?;
    let mint_b = next_account_info(accounts_iter)?;
    let vault_a = next_account_info(accounts_iter)?;
    let vault_b = next_account_info(accounts_iter)?;
    let mint_lp = next_account_info(accounts_iter)?;
    let token_program = next_account_info(accounts_iter)?;
    let associated_token_program = next_account_info(accounts_iter)?;
    let system_program = next_account_info(accounts_iter)?;

    if !payer.is_signer {
        return Err(ProgramError::MissingRequiredSignature);
    }

    check_programs(token_program, associated_token_program, system_program)?;

    let pair = PairKey::new(mint_a.key, mint_b.key)?;
    let (pool_pda, pool_bump) = pair.find_pool_address(program_id);

    if *pool.key != pool_pda {
        return Err(AmmError::PoolAddressMismatch.into());
    }

    if !pool.data_is_empty() {
        return Err(AmmError::PoolExists.into());
    }

    check_vault(pool, mint_a, vault_a)?;
    check_vault(pool, mint_b, vault_b)?;

    let (lp_mint_pda, lp_mint_bump) = LiquidityPool::find_share_mint_address(pool.key, program_id);

    if *mint_lp.key != lp_mint_pda {
        return Err(AmmError::LpMintAddressMismatch.into());
    }

    let pool_data = LiquidityPool::new(
        *mint_a.key,
        *mint_b.key,
        lp_mint_pda,
        fee_rate,
        max_swap_fraction,
        pool_bump,
        share_name,
    )?;

    let rent = Rent::get()?;

    // pool record, owned by this program
    invoke_signed(
        &create_account(
            payer.key,
            pool.key,
            rent.minimum_balance(LiquidityPool::SPACE),
            LiquidityPool::SPACE as u64,
            program_id,
        ),
        &[payer.clone(), pool.clone(), system_program.clone()],
        &[
            &[LiquidityPool::SEED_PREFIX, pair.lo().as_ref(), pair.hi().as_ref(), &[pool_bump]],
        ],
    )?;

    // reserve vaults are the pool's associated token accounts
    for (mint, vault) in [(mint_a, vault_a), (mint_b, vault_b)] {
        ensure_associated_token_account(
            payer, pool, mint, vault, token_program, associated_token_program, system_program,
        )?;
    }

    // share mint, with the pool as mint authority
    invoke_signed(
        &create_account(
            payer.key,
            mint_lp.key,
            rent.minimum_balance(Mint::LEN),
            Mint::LEN as u64,
            token_program.key,
        ),
        &[payer.clone(), mint_lp.clone(), system_program.clone()],
        &[
            &[LiquidityPool::LP_MINT_SEED_PREFIX, pool.key.as_ref(), &[lp_mint_bump]],
        ],
    )?;

    invoke(
        &initialize_mint2(
            token_program.key,
            mint_lp.key,
            pool.key,
            None,
            LiquidityPool::SHARE_DECIMALS,
        )?,
        &[mint_lp.clone(), token_program.clone()],
    )?;

    pool_data.serialize(&mut &mut pool.data.borrow_mut()[..])?;

    msg!("created pool {} ({})", pool.key, pool_data.share_name);

    AmmEvent::PoolCreated {
        asset_a: pool_data.asset_a,
        asset_b: pool_data.asset_b,
        pool: *pool.key,
    }
    .emit()
}

pub fn process_deposit<'a, 'info>(
    program_id: &Pubkey,
    accounts: &'a [AccountInfo<'info>],
    want_a: u64,
    want_b: u64,
    min_shares: u64,
) -> ProgramResult {
    let accounts_iter = &mut accounts.iter();

    let user = next_account_info(accounts_iter)?;
    let pool = next_account_info(accounts_iter)?;
    let mint_a = next_account_info(accounts_iter)?;
    let mint_b = next_account_info(accounts_iter)?;
    let vault_a = next_account_info(accounts_iter)?;
    let vault_b = next_account_info(accounts_iter)?;
    let mint_lp = next_account_info(accounts_iter)?;
    let user_ata_lp = next_account_info(accounts_iter)?;
    let user_ata_a = next_account_info(accounts_iter)?;
    let user_ata_b = next_account_info(accounts_iter)?;
    let token_program = next_account_info(accounts_iter)?;
    let associated_token_program = next_account_info(accounts_iter)?;
    let system_program = next_account_info(accounts_iter)?;

    if !user.is_signer {
        return Err(ProgramError::MissingRequiredSignature);
    }

    check_programs(token_program, associated_token_program, system_program)?;

    let pool_data = load_pool(program_id, pool)?;
    let aligned = is_aligned(&pool_data, mint_a, mint_b)?;

    let side_a = Side { mint: mint_a, vault: vault_a, user_ata: user_ata_a };
    let side_b = Side { mint: mint_b, vault: vault_b, user_ata: user_ata_b };
    let (side_a, side_b, want_a, want_b) = if aligned {
        (side_a, side_b, want_a, want_b)
    } else {
        (side_b, side_a, want_b, want_a)
    };

    check_vault(pool, side_a.mint, side_a.vault)?;
    check_vault(pool, side_b.mint, side_b.vault)?;

    if *mint_lp.key != pool_data.share_mint {
        return Err(AmmError::LpMintAddressMismatch.into());
    }

    ensure_associated_token_account(
        user, user, mint_lp, user_ata_lp, token_program, associated_token_program, system_program,
    )?;

    let mut ledger = TokenLedger::new(token_program, pool, pool_data.pair()?, pool_data.bump)?
        .hold(side_a.mint, user, side_a.user_ata)?
        .hold(side_b.mint, user, side_b.user_ata)?
        .hold(side_a.mint, pool, side_a.vault)?
        .hold(side_b.mint, pool, side_b.vault)?
        .hold(mint_lp, user, user_ata_lp)?;

    let deposit = Pool::new(*pool.key, &pool_data)
        .deposit(&mut ledger, user.key, want_a, want_b, min_shares)?;

    msg!(
        "deposited {}/{} for {} shares",
        deposit.used_a,
        deposit.used_b,
        deposit.minted_shares,
    );

    Ok(())
}

pub fn process_withdraw<'a, 'info>(
    program_id: &Pubkey,
    accounts: &'a [AccountInfo<'info>],
    burn_shares: u64,
    min_a: u64,
    min_b: u64,
) -> ProgramResult {
    let accounts_iter = &mut accounts.iter();

    let user = next_account_info(accounts_iter)?;
    let pool = next_account_info(accounts_iter)?;
    let mint_a = next_account_info(accounts_iter)?;
    let mint_b = next_account_info(accounts_iter)?;
    let vault_a = next_account_info(accounts_iter)?;
    let vault_b = next_account_info(accounts_iter)?;
    let mint_lp = next_account_info(accounts_iter)?;
    let user_ata_lp = next_account_info(accounts_iter)?;
    let user_ata_a = next_account_info(accounts_iter)?;
    let user_ata_b = next_account_info(accounts_iter)?;
    let token_program = next_account_info(accounts_iter)?;
    let associated_token_program = next_account_info(accounts_iter)?;
    let system_program = next_account_info(accounts_iter)?;

    if !user.is_signer {
        return Err(ProgramError::MissingRequiredSignature);
    }

    check_programs(token_program, associated_token_program, system_program)?;

    let pool_data = load_pool(program_id, pool)?;
    let aligned = is_aligned(&pool_data, mint_a, mint_b)?;

    let side_a = Side { mint: mint_a, vault: vault_a, user_ata: user_ata_a };
    let side_b = Side { mint: mint_b, vault: vault_b, user_ata: user_ata_b };
    let (side_a, side_b, min_a, min_b) = if aligned {
        (side_a, side_b, min_a, min_b)
    } else {
        (side_b, side_a, min_b, min_a)
    };

    check_vault(pool, side_a.mint, side_a.vault)?;
    check_vault(pool, side_b.mint, side_b.vault)?;

    if *mint_lp.key != pool_data.share_mint {
        return Err(AmmError::LpMintAddressMismatch.into());
    }

    for side in [&side_a, &side_b] {
        ensure_associated_token_account(
            user, user, side.mint, side.user_ata, token_program, associated_token_program, system_program,
        )?;
    }

    let mut ledger = TokenLedger::new(token_program, pool, pool_data.pair()?, pool_data.bump)?
        .hold(side_a.mint, user, side_a.user_ata)?
        .hold(side_b.mint, user, side_b.user_ata)?
        .hold(side_a.mint, pool, side_a.vault)?
        .hold(side_b.mint, pool, side_b.vault)?
        .hold(mint_lp, user, user_ata_lp)?;

    let withdrawal = Pool::new(*pool.key, &pool_data)
        .withdraw(&mut ledger, user.key, burn_shares, min_a, min_b)?;

    msg!(
        "burned {} shares for {}/{}",
        burn_shares,
        withdrawal.out_a,
        withdrawal.out_b,
    );

    Ok(())
}

/// The caller's bound on one side of a swap.
#[derive(Debug, Clone, Copy)]
pub enum SwapLimit {
    ExactInput { amount_in: u64, min_amount_out: u64 },
    ExactOutput { max_amount_in: u64, amount_out: u64 },
}

pub fn process_swap<'a, 'info>(
    program_id: &Pubkey,
    accounts: &'a [AccountInfo<'info>],
    limit: SwapLimit,
) -> ProgramResult {
    let accounts_iter = &mut accounts.iter();

    let user = next_account_info(accounts_iter)?;
    let pool = next_account_info(accounts_iter)?;
    let mint_in = next_account_info(accounts_iter)?;
    let mint_out = next_account_info(accounts_iter)?;
    let vault_in = next_account_info(accounts_iter)?;
    let vault_out = next_account_info(accounts_iter)?;
    let user_ata_in = next_account_info(accounts_iter)?;
    let user_ata_out = next_account_info(accounts_iter)?;
    let token_program = next_account_info(accounts_iter)?;
    let associated_token_program = next_account_info(accounts_iter)?;
    let system_program = next_account_info(accounts_iter)?;

    if !user.is_signer {
        return Err(ProgramError::MissingRequiredSignature);
    }

    check_programs(token_program, associated_token_program, system_program)?;

    let pool_data = load_pool(program_id, pool)?;
    is_aligned(&pool_data, mint_in, mint_out)?;

    check_vault(pool, mint_in, vault_in)?;
    check_vault(pool, mint_out, vault_out)?;

    ensure_associated_token_account(
        user, user, mint_out, user_ata_out, token_program, associated_token_program, system_program,
    )?;

    let mut ledger = TokenLedger::new(token_program, pool, pool_data.pair()?, pool_data.bump)?
        .hold(mint_in, user, user_ata_in)?
        .hold(mint_out, user, user_ata_out)?
        .hold(mint_in, pool, vault_in)?
        .hold(mint_out, pool, vault_out)?;

    let engine = Pool::new(*pool.key, &pool_data);

    let swap = match limit {
        SwapLimit::ExactInput { amount_in, min_amount_out } => engine.swap_exact_input(
            &mut ledger, user.key, mint_in.key, mint_out.key, amount_in, min_amount_out,
        )?,
        SwapLimit::ExactOutput { max_amount_in, amount_out } => engine.swap_exact_output(
            &mut ledger, user.key, mint_in.key, mint_out.key, max_amount_in, amount_out,
        )?,
    };

    AmmEvent::Swap {
        sender: *user.key,
        asset_in: *mint_in.key,
        asset_out: *mint_out.key,
        amount_in: swap.amount_in,
        amount_out: swap.amount_out,
    }
    .emit()
}

/// One asset's accounts in a liquidity instruction.
struct Side<'a, 'info> {
    mint: &'a AccountInfo<'info>,
    vault: &'a AccountInfo<'info>,
    user_ata: &'a AccountInfo<'info>,
}

fn check_programs(
    token_program: &AccountInfo,
    associated_token_program: &AccountInfo,
    system_program: &AccountInfo,
) -> ProgramResult {
    if *token_program.key != token_program_id() {
        return Err(ProgramError::IncorrectProgramId);
    }

    if *associated_token_program.key != associated_token_program_id() {
        return Err(ProgramError::IncorrectProgramId);
    }

    if *system_program.key != system_program_id() {
        return Err(ProgramError::IncorrectProgramId);
    }

    Ok(())
}

fn check_vault(pool: &AccountInfo, mint: &AccountInfo, vault: &AccountInfo) -> ProgramResult {
    if *vault.key != get_associated_token_address(pool.key, mint.key) {
        return Err(AmmError::VaultAddressMismatch.into());
    }

    Ok(())
}

/// Reads the pool record and checks that `pool` is the address it derives to.
fn load_pool(program_id: &Pubkey, pool: &AccountInfo) -> Result<LiquidityPool, ProgramError> {
    if pool.owner != program_id || pool.data_is_empty() {
        return Err(AmmError::PoolNotFound.into());
    }

    let pool_data = try_from_slice_unchecked::<LiquidityPool>(&pool.data.borrow())?;

    if pool_data.pair()?.create_pool_address(pool_data.bump, program_id)? != *pool.key {
        return Err(AmmError::PoolAddressMismatch.into());
    }

    Ok(pool_data)
}

/// Whether the passed mints are in the pool's `(asset_a, asset_b)` order.
/// Fails when they are not the pool's pair at all.
fn is_aligned(
    pool_data: &LiquidityPool,
    mint_a: &AccountInfo,
    mint_b: &AccountInfo,
) -> Result<bool, ProgramError> {
    if PairKey::new(mint_a.key, mint_b.key)? != pool_data.pair()? {
        return Err(AmmError::MintAddressMismatch.into());
    }

    Ok(*mint_a.key == pool_data.asset_a)
}

fn ensure_associated_token_account<'info>(
    payer: &AccountInfo<'info>,
    wallet: &AccountInfo<'info>,
    mint: &AccountInfo<'info>,
    ata: &AccountInfo<'info>,
    token_program: &AccountInfo<'info>,
    associated_token_program: &AccountInfo<'info>,
    system_program: &AccountInfo<'info>,
) -> ProgramResult {
    if *ata.key != get_associated_token_address(wallet.key, mint.key) {
        return Err(AmmError::TokenAccountMismatch.into());
    }

    if !ata.data_is_empty() {
        return Ok(());
    }

    invoke(
        &create_associated_token_account_idempotent(
            payer.key,
            wallet.key,
            mint.key,
            token_program.key,
        ),
        &[
            payer.clone(),
            ata.clone(),
            wallet.clone(),
            mint.clone(),
            system_program.clone(),
            token_program.clone(),
            associated_token_program.clone(),
        ],
    )
}
