use anyhow::{anyhow, Result};

use solana_program_test::*;

use solana_program::program_pack::Pack;

use solana_sdk::{
    instruction::{Instruction, InstructionError},
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    transaction::{Transaction, TransactionError},
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
    error::AmmError,
    instruction,
    processor::process_instruction,
    state::{LiquidityPool, PairKey},
};

struct Harness {
    banks_client: BanksClient,
    payer: Keypair,
    program_id: Pubkey,
}

impl Harness {
    async fn start() -> Self {
        let program_id = Pubkey::new_unique();

        let (banks_client, payer, _) = ProgramTest::new(
            "pair_pool",
            program_id,
            processor!(process_instruction),
        ).start().await;

        Self { banks_client, payer, program_id }
    }

    async fn send(&mut self, instructions: &[Instruction], signers: &[&Keypair]) -> Result<(), BanksClientError> {
        let recent_blockhash = self.banks_client.get_latest_blockhash().await?;

        let mut all_signers = vec![&self.payer];
        all_signers.extend_from_slice(signers);

        let tx = Transaction::new_signed_with_payer(
            instructions,
            Some(&self.payer.pubkey()),
            &all_signers,
            recent_blockhash,
        );

        self.banks_client.process_transaction(tx).await
    }

    async fn create_mint(&mut self) -> Result<Pubkey> {
        let mint = Keypair::new();
        let rent = self.banks_client.get_rent().await?;

        let instructions = [
            create_account(
                &self.payer.pubkey(),
                &mint.pubkey(),
                rent.minimum_balance(Mint::LEN),
                Mint::LEN as u64,
                &token_program_id(),
            ),
            initialize_mint2(&token_program_id(), &mint.pubkey(), &self.payer.pubkey(), None, 6)?,
        ];

        self.send(&instructions, &[&mint]).await?;

        Ok(mint.pubkey())
    }

    /// Mints `amount` of `mint` into the payer's associated token account.
    async fn fund(&mut self, mint: &Pubkey, amount: u64) -> Result<()> {
        let payer = self.payer.pubkey();
        let ata = get_associated_token_address(&payer, mint);

        let instructions = [
            create_associated_token_account_idempotent(&payer, &payer, mint, &token_program_id()),
            mint_to(&token_program_id(), mint, &ata, &payer, &[], amount)?,
        ];

        self.send(&instructions, &[]).await?;

        Ok(())
    }

    async fn balance(&mut self, owner: &Pubkey, mint: &Pubkey) -> Result<u64> {
        let account = self.banks_client
            .get_account(get_associated_token_address(owner, mint))
            .await?
            .ok_or_else(|| anyhow!("no token account for {mint}"))?;

        Ok(TokenAccount::unpack(&account.data)?.amount)
    }
}

fn custom(error: AmmError) -> TransactionError {
    TransactionError::InstructionError(0, InstructionError::Custom(error as u32))
}

#[tokio::test]
async fn instruction_flow_test() -> Result<()> {
    let mut harness = Harness::start().await;
    let program_id = harness.program_id;
    let user = harness.payer.pubkey();

    let mint_a = harness.create_mint().await?;
    let mint_b = harness.create_mint().await?;
    harness.fund(&mint_a, 10_000).await?;
    harness.fund(&mint_b, 10_000).await?;

    let (pool, _) = PairKey::new(&mint_a, &mint_b)?.find_pool_address(&program_id);
    let (mint_lp, _) = LiquidityPool::find_share_mint_address(&pool, &program_id);

    println!("Testing create pool instruction...");

    let ix = instruction::create_pool(&program_id, &user, &mint_a, &mint_b, 1, 50, "A-B LP".to_string())?;
    harness.send(&[ix], &[]).await?;

    let account = harness.banks_client.get_account(pool).await?.ok_or_else(|| anyhow!("pool not created"))?;
    assert_eq!(account.owner, program_id);

    let ix = instruction::create_pool(&program_id, &user, &mint_b, &mint_a, 1, 50, "B-A LP".to_string())?;
    let err = harness.send(&[ix], &[]).await.unwrap_err().unwrap();
    assert_eq!(err, custom(AmmError::PoolExists));

    println!("Testing deposit instruction...");

    let ix = instruction::deposit(&program_id, &user, &mint_a, &mint_b, 1_000, 4_000, 2_000)?;
    harness.send(&[ix], &[]).await?;

    assert_eq!(harness.balance(&user, &mint_lp).await?, 2_000);
    assert_eq!(harness.balance(&pool, &mint_a).await?, 1_000);
    assert_eq!(harness.balance(&pool, &mint_b).await?, 4_000);

    println!("Testing swap instructions...");

    let ix = instruction::swap_exact_input(&program_id, &user, &mint_a, &mint_b, 100, 396)?;
    harness.send(&[ix], &[]).await?;

    assert_eq!(harness.balance(&user, &mint_a).await?, 8_900);
    assert_eq!(harness.balance(&user, &mint_b).await?, 6_396);
    assert_eq!(harness.balance(&pool, &mint_a).await?, 1_100);
    assert_eq!(harness.balance(&pool, &mint_b).await?, 3_604);

    // cap is 50% of the 1_100 input reserve
    let ix = instruction::swap_exact_input(&program_id, &user, &mint_a, &mint_b, 600, 0)?;
    let err = harness.send(&[ix], &[]).await.unwrap_err().unwrap();
    assert_eq!(err, custom(AmmError::ExceedsMaxSwap));

    let ix = instruction::swap_exact_input(&program_id, &user, &mint_a, &mint_b, 100, 1_000)?;
    let err = harness.send(&[ix], &[]).await.unwrap_err().unwrap();
    assert_eq!(err, custom(AmmError::SlippageExceeded));

    println!("Testing withdraw instruction...");

    // mints passed in reverse order, minimums follow them
    let ix = instruction::withdraw(&program_id, &user, &mint_b, &mint_a, 1_000, 1_802, 550)?;
    harness.send(&[ix], &[]).await?;

    assert_eq!(harness.balance(&user, &mint_lp).await?, 1_000);
    assert_eq!(harness.balance(&pool, &mint_a).await?, 550);
    assert_eq!(harness.balance(&pool, &mint_b).await?, 1_802);
    assert_eq!(harness.balance(&user, &mint_a).await?, 9_450);
    assert_eq!(harness.balance(&user, &mint_b).await?, 8_198);

    let ix = instruction::withdraw(&program_id, &user, &mint_a, &mint_b, 1_001, 0, 0)?;
    let err = harness.send(&[ix], &[]).await.unwrap_err().unwrap();
    assert_eq!(err, custom(AmmError::InsufficientShares));

    Ok(())
}

#[tokio::test]
async fn operations_on_missing_pool_fail() -> Result<()> {
    let mut harness = Harness::start().await;
    let program_id = harness.program_id;
    let user = harness.payer.pubkey();

    let mint_a = harness.create_mint().await?;
    let mint_b = harness.create_mint().await?;
    harness.fund(&mint_a, 1_000).await?;
    harness.fund(&mint_b, 1_000).await?;

    let ix = instruction::deposit(&program_id, &user, &mint_a, &mint_b, 100, 100, 0)?;
    let err = harness.send(&[ix], &[]).await.unwrap_err().unwrap();
    assert_eq!(err, custom(AmmError::PoolNotFound));

    let ix = instruction::create_pool(&program_id, &user, &mint_a, &mint_b, 101, 50, "LP".to_string())?;
    let err = harness.send(&[ix], &[]).await.unwrap_err().unwrap();
    assert_eq!(err, custom(AmmError::InvalidPercentage));

    Ok(())
}

#[tokio::test]
async fn exact_output_swap_flow_test() -> Result<()> {
    let mut harness = Harness::start().await;
    let program_id = harness.program_id;
    let user = harness.payer.pubkey();

    let mint_a = harness.create_mint().await?;
    let mint_b = harness.create_mint().await?;
    harness.fund(&mint_a, 10_000).await?;
    harness.fund(&mint_b, 10_000).await?;

    let (pool, _) = PairKey::new(&mint_a, &mint_b)?.find_pool_address(&program_id);

    let ix = instruction::create_pool(&program_id, &user, &mint_a, &mint_b, 10, 50, "A-B LP".to_string())?;
    harness.send(&[ix], &[]).await?;

    let ix = instruction::deposit(&program_id, &user, &mint_a, &mint_b, 1_500, 6_000, 3_000)?;
    harness.send(&[ix], &[]).await?;

    println!("Testing exact output swap instruction...");

    // raw = 100 * 6000 / 1500 = 400, gross = 400 * 110 / 100 = 440
    let ix = instruction::swap_exact_output(&program_id, &user, &mint_b, &mint_a, 439, 100)?;
    let err = harness.send(&[ix], &[]).await.unwrap_err().unwrap();
    assert_eq!(err, custom(AmmError::SlippageExceeded));

    let ix = instruction::swap_exact_output(&program_id, &user, &mint_b, &mint_a, 440, 100)?;
    harness.send(&[ix], &[]).await?;

    assert_eq!(harness.balance(&pool, &mint_a).await?, 1_400);
    assert_eq!(harness.balance(&pool, &mint_b).await?, 6_440);
    assert_eq!(harness.balance(&user, &mint_a).await?, 8_600);
    assert_eq!(harness.balance(&user, &mint_b).await?, 3_560);

    // prices to a zero input
    let ix = instruction::swap_exact_output(&program_id, &user, &mint_a, &mint_b, 0, 3)?;
    let err = harness.send(&[ix], &[]).await.unwrap_err().unwrap();
    assert_eq!(err, custom(AmmError::ZeroAmount));

    Ok(())
}
