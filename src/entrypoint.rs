use solana_program::{
    entrypoint,
    entrypoint::ProgramResult,
    pubkey::Pubkey,
    account_info::AccountInfo,
    msg,
};

use crate::processor;

entrypoint!(process_instruction);

fn process_instruction(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    instruction_data: &[u8],
) -> ProgramResult {
    msg!(
        "pair-pool: {} accounts, instruction {:?}",
        accounts.len(),
        instruction_data.first(),
    );

    processor::process_instruction(program_id, accounts, instruction_data)
}
