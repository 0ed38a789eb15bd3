use solana_program::{
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
    pubkey::Pubkey,
};

use solana_system_interface::program::id as system_program_id;

use spl_associated_token_account::{
    id as associated_token_program_id,
    get_associated_token_address,
};
use spl_token::id as token_program_id;

use borsh::{BorshSerialize, BorshDeserialize};

use crate::state::{LiquidityPool, PairKey};

/// Program instructions. The wire format is a one-byte discriminator
/// (the variant index) followed by the borsh payload.
#[derive(BorshSerialize, Debug, Clone, PartialEq, Eq)]
pub enum AmmInstruction {
    CreatePool {
        fee_rate: u8,
        max_swap_fraction: u8,
        share_name: String,
    },
    Deposit {
        want_a: u64,
        want_b: u64,
        min_shares: u64,
    },
    Withdraw {
        burn_shares: u64,
        min_a: u64,
        min_b: u64,
    },
    SwapExactInput {
        amount_in: u64,
        min_amount_out: u64,
    },
    SwapExactOutput {
        max_amount_in: u64,
        amount_out: u64,
    },
}

impl AmmInstruction {
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        let (&discriminator, rest) = input.split_first()
            .ok_or(ProgramError::InvalidInstructionData)?;

        Ok(
            match discriminator {
                0 => {
                    let payload = CreatePoolPayload::try_from_slice(rest)
                        .map_err(|_| ProgramError::InvalidInstructionData)?;

                    Self::CreatePool {
                        fee_rate: payload.fee_rate,
                        max_swap_fraction: payload.max_swap_fraction,
                        share_name: payload.share_name,
                    }
                },
                1 => {
                    let payload = DepositPayload::try_from_slice(rest)
                        .map_err(|_| ProgramError::InvalidInstructionData)?;

                    Self::Deposit {
                        want_a: payload.want_a,
                        want_b: payload.want_b,
                        min_shares: payload.min_shares,
                    }
                },
                2 => {
                    let payload = WithdrawPayload::try_from_slice(rest)
                        .map_err(|_| ProgramError::InvalidInstructionData)?;

                    Self::Withdraw {
                        burn_shares: payload.burn_shares,
                        min_a: payload.min_a,
                        min_b: payload.min_b,
                    }
                },
                3 => {
                    let payload = SwapExactInputPayload::try_from_slice(rest)
                        .map_err(|_| ProgramError::InvalidInstructionData)?;

                    Self::SwapExactInput {
                        amount_in: payload.amount_in,
                        min_amount_out: payload.min_amount_out,
                    }
                },
                4 => {
                    let payload = SwapExactOutputPayload::try_from_slice(rest)
                        .map_err(|_| ProgramError::InvalidInstructionData)?;

                    Self::SwapExactOutput {
                        max_amount_in: payload.max_amount_in,
                        amount_out: payload.amount_out,
                    }
                },

                _ => return Err(ProgramError::InvalidInstructionData)
            }
        )
    }
}

#[derive(BorshDeserialize)]
struct CreatePoolPayload {
    fee_rate: u8,
    max_swap_fraction: u8,
    share_name: String,
}

#[derive(BorshDeserialize)]
struct DepositPayload {
    want_a: u64,
    want_b: u64,
    min_shares: u64,
}

#[derive(BorshDeserialize)]
struct WithdrawPayload {
    burn_shares: u64,
    min_a: u64,
    min_b: u64,
}

#[derive(BorshDeserialize)]
struct SwapExactInputPayload {
    amount_in: u64,
    min_amount_out: u64,
}

#[derive(BorshDeserialize)]
struct SwapExactOutputPayload {
    max_amount_in: u64,
    amount_out: u64,
}

fn pool_addresses(program_id: &Pubkey, mint_a: &Pubkey, mint_b: &Pubkey) -> Result<(Pubkey, Pubkey), ProgramError> {
    let (pool, _) = PairKey::new(mint_a, mint_b)?.find_pool_address(program_id);
    let (mint_lp, _) = LiquidityPool::find_share_mint_address(&pool, program_id);

    Ok((pool, mint_lp))
}

pub fn create_pool(
    program_id: &Pubkey,
    payer: &Pubkey,
    mint_a: &Pubkey,
    mint_b: &Pubkey,
    fee_rate: u8,
    max_swap_fraction: u8,
    share_name: String,
) -> Result<Instruction, ProgramError> {
    let (pool, mint_lp) = pool_addresses(program_id, mint_a, mint_b)?;

    Ok(Instruction::new_with_borsh(
        *program_id,
        &AmmInstruction::CreatePool { fee_rate, max_swap_fraction, share_name },
        vec![
            AccountMeta::new(*payer, true),
            AccountMeta::new(pool, false),
            AccountMeta::new_readonly(*mint_a, false),
            AccountMeta::new_readonly(*mint_b, false),
            AccountMeta::new(get_associated_token_address(&pool, mint_a), false),
            AccountMeta::new(get_associated_token_address(&pool, mint_b), false),
            AccountMeta::new(mint_lp, false),
            AccountMeta::new_readonly(token_program_id(), false),
            AccountMeta::new_readonly(associated_token_program_id(), false),
            AccountMeta::new_readonly(system_program_id(), false),
        ],
    ))
}

/// Accounts shared by deposit and withdraw.
fn liquidity_accounts(
    program_id: &Pubkey,
    user: &Pubkey,
    mint_a: &Pubkey,
    mint_b: &Pubkey,
) -> Result<Vec<AccountMeta>, ProgramError> {
    let (pool, mint_lp) = pool_addresses(program_id, mint_a, mint_b)?;

    Ok(vec![
        AccountMeta::new(*user, true),
        AccountMeta::new_readonly(pool, false),
        AccountMeta::new_readonly(*mint_a, false),
        AccountMeta::new_readonly(*mint_b, false),
        AccountMeta::new(get_associated_token_address(&pool, mint_a), false),
        AccountMeta::new(get_associated_token_address(&pool, mint_b), false),
        AccountMeta::new(mint_lp, false),
        AccountMeta::new(get_associated_token_address(user, &mint_lp), false),
        AccountMeta::new(get_associated_token_address(user, mint_a), false),
        AccountMeta::new(get_associated_token_address(user, mint_b), false),
        AccountMeta::new_readonly(token_program_id(), false),
        AccountMeta::new_readonly(associated_token_program_id(), false),
        AccountMeta::new_readonly(system_program_id(), false),
    ])
}

pub fn deposit(
    program_id: &Pubkey,
    user: &Pubkey,
    mint_a: &Pubkey,
    mint_b: &Pubkey,
    want_a: u64,
    want_b: u64,
    min_shares: u64,
) -> Result<Instruction, ProgramError> {
    Ok(Instruction::new_with_borsh(
        *program_id,
        &AmmInstruction::Deposit { want_a, want_b, min_shares },
        liquidity_accounts(program_id, user, mint_a, mint_b)?,
    ))
}

pub fn withdraw(
    program_id: &Pubkey,
    user: &Pubkey,
    mint_a: &Pubkey,
    mint_b: &Pubkey,
    burn_shares: u64,
    min_a: u64,
    min_b: u64,
) -> Result<Instruction, ProgramError> {
    Ok(Instruction::new_with_borsh(
        *program_id,
        &AmmInstruction::Withdraw { burn_shares, min_a, min_b },
        liquidity_accounts(program_id, user, mint_a, mint_b)?,
    ))
}

fn swap_accounts(
    program_id: &Pubkey,
    user: &Pubkey,
    mint_in: &Pubkey,
    mint_out: &Pubkey,
) -> Result<Vec<AccountMeta>, ProgramError> {
    let (pool, _) = pool_addresses(program_id, mint_in, mint_out)?;

    Ok(vec![
        AccountMeta::new(*user, true),
        AccountMeta::new_readonly(pool, false),
        AccountMeta::new_readonly(*mint_in, false),
        AccountMeta::new_readonly(*mint_out, false),
        AccountMeta::new(get_associated_token_address(&pool, mint_in), false),
        AccountMeta::new(get_associated_token_address(&pool, mint_out), false),
        AccountMeta::new(get_associated_token_address(user, mint_in), false),
        AccountMeta::new(get_associated_token_address(user, mint_out), false),
        AccountMeta::new_readonly(token_program_id(), false),
        AccountMeta::new_readonly(associated_token_program_id(), false),
        AccountMeta::new_readonly(system_program_id(), false),
    ])
}

pub fn swap_exact_input(
    program_id: &Pubkey,
    user: &Pubkey,
    mint_in: &Pubkey,
    mint_out: &Pubkey,
    amount_in: u64,
    min_amount_out: u64,
) -> Result<Instruction, ProgramError> {
    Ok(Instruction::new_with_borsh(
        *program_id,
        &AmmInstruction::SwapExactInput { amount_in, min_amount_out },
        swap_accounts(program_id, user, mint_in, mint_out)?,
    ))
}

pub fn swap_exact_output(
    program_id: &Pubkey,
    user: &Pubkey,
    mint_in: &Pubkey,
    mint_out: &Pubkey,
    max_amount_in: u64,
    amount_out: u64,
) -> Result<Instruction, ProgramError> {
    Ok(Instruction::new_with_borsh(
        *program_id,
        &AmmInstruction::SwapExactOutput { max_amount_in, amount_out },
        swap_accounts(program_id, user, mint_in, mint_out)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_encode_what_unpack_reads() {
        let program_id = Pubkey::new_unique();
        let (user, mint_a, mint_b) = (Pubkey::new_unique(), Pubkey::new_unique(), Pubkey::new_unique());

        let create = create_pool(&program_id, &user, &mint_a, &mint_b, 1, 50, "A-B".to_string()).unwrap();
        assert_eq!(create.data[0], 0);
        assert_eq!(
            AmmInstruction::unpack(&create.data).unwrap(),
            AmmInstruction::CreatePool { fee_rate: 1, max_swap_fraction: 50, share_name: "A-B".to_string() },
        );

        let swap = swap_exact_output(&program_id, &user, &mint_b, &mint_a, 440, 100).unwrap();
        assert_eq!(swap.data[0], 4);
        assert_eq!(
            AmmInstruction::unpack(&swap.data).unwrap(),
            AmmInstruction::SwapExactOutput { max_amount_in: 440, amount_out: 100 },
        );
    }

    #[test]
    fn pair_order_does_not_change_pool_address() {
        let program_id = Pubkey::new_unique();
        let (user, mint_a, mint_b) = (Pubkey::new_unique(), Pubkey::new_unique(), Pubkey::new_unique());

        let forward = deposit(&program_id, &user, &mint_a, &mint_b, 1, 1, 0).unwrap();
        let backward = deposit(&program_id, &user, &mint_b, &mint_a, 1, 1, 0).unwrap();

        assert_eq!(forward.accounts[1].pubkey, backward.accounts[1].pubkey);
        assert_eq!(forward.accounts[6].pubkey, backward.accounts[6].pubkey);
    }

    #[test]
    fn unpack_rejects_bad_data() {
        assert_eq!(AmmInstruction::unpack(&[]), Err(ProgramError::InvalidInstructionData));
        assert_eq!(AmmInstruction::unpack(&[9]), Err(ProgramError::InvalidInstructionData));
        assert_eq!(AmmInstruction::unpack(&[1, 0, 0]), Err(ProgramError::InvalidInstructionData));
    }

    #[test]
    fn builders_reject_identical_mints() {
        let program_id = Pubkey::new_unique();
        let (user, mint) = (Pubkey::new_unique(), Pubkey::new_unique());

        assert!(swap_exact_input(&program_id, &user, &mint, &mint, 1, 0).is_err());
    }
}
