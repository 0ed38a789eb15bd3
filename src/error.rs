use thiserror::Error;

use solana_program::program_error::ProgramError;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmmError {
    // Error 0
    #[error("Pool assets must be different")]
    IdenticalAssets,
    // Error 1
    #[error("A pool for this asset pair already exists")]
    PoolExists,
    // Error 2
    #[error("No pool is registered for this asset pair")]
    PoolNotFound,
    // Error 3
    #[error("Slippage tolerance exceeded")]
    SlippageExceeded,
    // Error 4
    #[error("Swap amount exceeds the pool's maximum swap fraction")]
    ExceedsMaxSwap,
    // Error 5
    #[error("Burn amount exceeds the holder's share balance")]
    InsufficientShares,
    // Error 6
    #[error("Owner balance is lower than the transfer amount")]
    InsufficientBalance,
    // Error 7
    #[error("Spender is not authorized to move the owner's funds")]
    InsufficientAuthorization,
    // Error 8
    #[error("Amount must be greater than zero")]
    ZeroAmount,
    // Error 9
    #[error("Pool has outstanding shares but an empty reserve")]
    EmptyReserve,
    // Error 10
    #[error("Asset is not traded by this pool")]
    AssetNotInPool,
    // Error 11
    #[error("Percentage parameters must not exceed 100")]
    InvalidPercentage,
    // Error 12
    #[error("Share asset name is too long")]
    ShareNameTooLong,
    // Error 13
    #[error("Pool address does not match PDA derived from the asset pair")]
    PoolAddressMismatch,
    // Error 14
    #[error("Vault address does not match ATA derived from mint and pool address")]
    VaultAddressMismatch,
    // Error 15
    #[error("Mint address does not match pool data")]
    MintAddressMismatch,
    // Error 16
    #[error("LP mint address does not match PDA derived from the pool")]
    LpMintAddressMismatch,
    // Error 17
    #[error("Token account does not hold the expected mint for the expected owner")]
    TokenAccountMismatch,
}

impl From<AmmError> for ProgramError {
    fn from(error: AmmError) -> Self {
        ProgramError::Custom(error as u32)
    }
}
