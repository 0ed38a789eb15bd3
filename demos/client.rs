//! Walks a deployed program through create, deposit, swap and withdraw
//! against a local validator.
//!
//! `AMM_RPC_URL` defaults to `http://localhost:8899` and
//! `AMM_PROGRAM_KEYPAIR` to `target/deploy/pair_pool-keypair.json`.

use std::env;

use anyhow::{anyhow, Result};

use solana_client::nonblocking::rpc_client::RpcClient;

use solana_program::program_pack::Pack;

use solana_sdk::{
    commitment_config::CommitmentConfig,
    signature::{Signer, Keypair, keypair},
    native_token::LAMPORTS_PER_SOL,
    instruction::Instruction,
    pubkey::Pubkey,
    transaction::Transaction,
};

use solana_system_interface::instruction::create_account;

use spl_associated_token_account::{
    get_associated_token_address,
    instruction::create_associated_token_account_idempotent,
};
use spl_token::{
    id as token_program_id,
    instruction::{initialize_mint2, mint_to},
    state::{Account as TokenAccount, Mint},
};

use pair_pool::{
    instruction,
    state::{LiquidityPool, PairKey},
};

async fn send(client: &RpcClient, fee_payer: &Keypair, instructions: &[Instruction], signers: &[&Keypair]) -> Result<()> {
    let recent_blockhash = client.get_latest_blockhash().await?;

    let mut all_signers = vec![fee_payer];
    all_signers.extend_from_slice(signers);

    let tx = Transaction::new_signed_with_payer(
        instructions,
        Some(&fee_payer.pubkey()),
        &all_signers,
        recent_blockhash,
    );

    let tx_signature = client.send_and_confirm_transaction_with_spinner(&tx).await?;
    println!("tx signature: {}", tx_signature);

    Ok(())
}

/// Creates a 6-decimal mint and mints `supply` of it to the fee payer.
async fn funded_mint(client: &RpcClient, fee_payer: &Keypair, supply: u64) -> Result<Pubkey> {
    let mint = Keypair::new();
    let owner = fee_payer.pubkey();
    let rent = client.get_minimum_balance_for_rent_exemption(Mint::LEN).await?;
    let ata = get_associated_token_address(&owner, &mint.pubkey());

    let instructions = [
        create_account(&owner, &mint.pubkey(), rent, Mint::LEN as u64, &token_program_id()),
        initialize_mint2(&token_program_id(), &mint.pubkey(), &owner, None, 6)?,
        create_associated_token_account_idempotent(&owner, &owner, &mint.pubkey(), &token_program_id()),
        mint_to(&token_program_id(), &mint.pubkey(), &ata, &owner, &[], supply)?,
    ];

    send(client, fee_payer, &instructions, &[&mint]).await?;

    Ok(mint.pubkey())
}

async fn token_balance(client: &RpcClient, owner: &Pubkey, mint: &Pubkey) -> Result<u64> {
    let data = client.get_account_data(&get_associated_token_address(owner, mint)).await?;

    Ok(TokenAccount::unpack(&data)?.amount)
}

#[tokio::main]
async fn main() -> Result<()> {
    let rpc_url = env::var("AMM_RPC_URL")
        .unwrap_or_else(|_| "http://localhost:8899".to_string());
    let keypair_path = env::var("AMM_PROGRAM_KEYPAIR")
        .unwrap_or_else(|_| "target/deploy/pair_pool-keypair.json".to_string());

    let program_id = keypair::read_keypair_file(&keypair_path)
        .map_err(|e| anyhow!("{e}"))?.pubkey();

    let client = RpcClient::new_with_commitment(rpc_url, CommitmentConfig::confirmed());

    let fee_payer = Keypair::new();
    let user = fee_payer.pubkey();

    let airdrop_signature = client.request_airdrop(&user, LAMPORTS_PER_SOL).await?;
    client.poll_for_signature(&airdrop_signature).await?;

    let mint_a = funded_mint(&client, &fee_payer, 1_000_000).await?;
    let mint_b = funded_mint(&client, &fee_payer, 1_000_000).await?;

    let (pool, _) = PairKey::new(&mint_a, &mint_b)?.find_pool_address(&program_id);
    let (mint_lp, _) = LiquidityPool::find_share_mint_address(&pool, &program_id);
    println!("pool: {pool}, share mint: {mint_lp}");

    let create = instruction::create_pool(&program_id, &user, &mint_a, &mint_b, 1, 50, "DEMO-LP".to_string())?;
    send(&client, &fee_payer, &[create], &[]).await?;

    let deposit = instruction::deposit(&program_id, &user, &mint_a, &mint_b, 10_000, 40_000, 0)?;
    send(&client, &fee_payer, &[deposit], &[]).await?;
    println!("shares held: {}", token_balance(&client, &user, &mint_lp).await?);

    let swap = instruction::swap_exact_input(&program_id, &user, &mint_a, &mint_b, 1_000, 0)?;
    send(&client, &fee_payer, &[swap], &[]).await?;

    let swap = instruction::swap_exact_output(&program_id, &user, &mint_b, &mint_a, 10_000, 500)?;
    send(&client, &fee_payer, &[swap], &[]).await?;

    println!(
        "reserves: {} / {}",
        token_balance(&client, &pool, &mint_a).await?,
        token_balance(&client, &pool, &mint_b).await?,
    );

    let shares = token_balance(&client, &user, &mint_lp).await?;
    let withdraw = instruction::withdraw(&program_id, &user, &mint_a, &mint_b, shares, 0, 0)?;
    send(&client, &fee_payer, &[withdraw], &[]).await?;

    println!(
        "after full withdrawal: {} / {}",
        token_balance(&client, &user, &mint_a).await?,
        token_balance(&client, &user, &mint_b).await?,
    );

    Ok(())
}
