//! Integer pricing for the pair pool.
//!
//! Every quote works on `u128` intermediates and truncates on division, so
//! rounding always favours the pool. Swaps price at the current spot ratio of
//! the two reserves; the trade's own size never moves its price, only the
//! percentage cap bounds it.

use solana_program::program_error::ProgramError;

use integer_sqrt::IntegerSquareRoot;

use crate::error::AmmError;

/// Denominator for `fee_rate` and `max_swap_fraction`.
pub const PERCENT: u128 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepositQuote {
    pub used_a: u64,
    pub used_b: u64,
    pub minted_shares: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WithdrawQuote {
    pub out_a: u64,
    pub out_b: u64,
}

fn narrow(value: u128) -> Result<u64, ProgramError> {
    u64::try_from(value).map_err(|_| ProgramError::ArithmeticOverflow)
}

/// `a * b / denominator`, truncating.
fn mul_div(a: u128, b: u128, denominator: u128) -> Result<u128, ProgramError> {
    if denominator == 0 {
        return Err(ProgramError::ArithmeticOverflow);
    }

    Ok(a.checked_mul(b).ok_or(ProgramError::ArithmeticOverflow)? / denominator)
}

pub fn quote_deposit(
    reserve_a: u64,
    reserve_b: u64,
    share_supply: u64,
    want_a: u64,
    want_b: u64,
) -> Result<DepositQuote, ProgramError> {
    if want_a == 0 || want_b == 0 {
        return Err(AmmError::ZeroAmount.into());
    }

    let want_a = want_a as u128;
    let want_b = want_b as u128;

    // bootstrap: the first deposit sets the ratio
    if share_supply == 0 {
        let minted = want_a
            .checked_mul(want_b)
            .ok_or(ProgramError::ArithmeticOverflow)?
            .integer_sqrt();

        return Ok(DepositQuote {
            used_a: narrow(want_a)?,
            used_b: narrow(want_b)?,
            minted_shares: narrow(minted)?,
        });
    }

    if reserve_a == 0 || reserve_b == 0 {
        return Err(AmmError::EmptyReserve.into());
    }

    let reserve_a = reserve_a as u128;
    let reserve_b = reserve_b as u128;

    let take_a;
    let take_b;

    let b_needed = mul_div(want_a, reserve_b, reserve_a)?;

    if b_needed <= want_b {
        take_a = want_a;
        take_b = b_needed;
    } else {
        take_b = want_b;
        take_a = mul_div(want_b, reserve_a, reserve_b)?;
    }

    let minted = mul_div(take_a, share_supply as u128, reserve_a)?;

    Ok(DepositQuote {
        used_a: narrow(take_a)?,
        used_b: narrow(take_b)?,
        minted_shares: narrow(minted)?,
    })
}

pub fn quote_withdraw(
    reserve_a: u64,
    reserve_b: u64,
    share_supply: u64,
    burn_shares: u64,
) -> Result<WithdrawQuote, ProgramError> {
    if burn_shares == 0 {
        return Err(AmmError::ZeroAmount.into());
    }

    if burn_shares > share_supply {
        return Err(AmmError::InsufficientShares.into());
    }

    let out_a = mul_div(burn_shares as u128, reserve_a as u128, share_supply as u128)?;
    let out_b = mul_div(burn_shares as u128, reserve_b as u128, share_supply as u128)?;

    Ok(WithdrawQuote {
        out_a: narrow(out_a)?,
        out_b: narrow(out_b)?,
    })
}

/// Largest single-trade amount against `reserve`.
pub fn swap_cap(reserve: u64, max_swap_fraction: u8) -> Result<u64, ProgramError> {
    narrow(mul_div(reserve as u128, max_swap_fraction as u128, PERCENT)?)
}

/// Output for an exact input. The size cap applies to the input reserve.
pub fn quote_exact_input(
    reserve_in: u64,
    reserve_out: u64,
    amount_in: u64,
    fee_rate: u8,
    max_swap_fraction: u8,
) -> Result<u64, ProgramError> {
    if amount_in == 0 {
        return Err(AmmError::ZeroAmount.into());
    }

    if fee_rate as u128 > PERCENT {
        return Err(AmmError::InvalidPercentage.into());
    }

    if amount_in > swap_cap(reserve_in, max_swap_fraction)? {
        return Err(AmmError::ExceedsMaxSwap.into());
    }

    let amount_in_post_fee = mul_div(amount_in as u128, PERCENT - fee_rate as u128, PERCENT)?;
    let amount_out = mul_div(amount_in_post_fee, reserve_out as u128, reserve_in as u128)?;

    narrow(amount_out)
}

/// Input required for an exact output. The size cap applies to the output reserve.
pub fn quote_exact_output(
    reserve_in: u64,
    reserve_out: u64,
    amount_out: u64,
    fee_rate: u8,
    max_swap_fraction: u8,
) -> Result<u64, ProgramError> {
    if amount_out == 0 {
        return Err(AmmError::ZeroAmount.into());
    }

    if fee_rate as u128 > PERCENT {
        return Err(AmmError::InvalidPercentage.into());
    }

    if amount_out > swap_cap(reserve_out, max_swap_fraction)? {
        return Err(AmmError::ExceedsMaxSwap.into());
    }

    let raw_amount_in = mul_div(amount_out as u128, reserve_in as u128, reserve_out as u128)?;
    let amount_in = mul_div(raw_amount_in, PERCENT + fee_rate as u128, PERCENT)?;

    // an output too small to price would otherwise be paid for with nothing
    if amount_in == 0 {
        return Err(AmmError::ZeroAmount.into());
    }

    narrow(amount_in)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn custom(error: AmmError) -> ProgramError {
        error.into()
    }

    #[test]
    fn bootstrap_deposit_mints_geometric_mean() {
        let quote = quote_deposit(0, 0, 0, 1_000, 4_000).unwrap();

        assert_eq!(quote, DepositQuote { used_a: 1_000, used_b: 4_000, minted_shares: 2_000 });
    }

    #[test]
    fn bootstrap_ignores_existing_reserves() {
        // donations made before the first deposit do not set the ratio
        let quote = quote_deposit(77, 5, 0, 9, 16).unwrap();

        assert_eq!(quote, DepositQuote { used_a: 9, used_b: 16, minted_shares: 12 });
    }

    #[test]
    fn deposit_takes_all_of_a_when_b_limit_allows() {
        let quote = quote_deposit(1_000, 4_000, 2_000, 500, 10_000).unwrap();

        assert_eq!(quote, DepositQuote { used_a: 500, used_b: 2_000, minted_shares: 1_000 });
    }

    #[test]
    fn deposit_recomputes_a_when_b_limit_binds() {
        let quote = quote_deposit(1_000, 4_000, 2_000, 500, 1_000).unwrap();

        assert_eq!(quote, DepositQuote { used_a: 250, used_b: 1_000, minted_shares: 500 });
    }

    #[test]
    fn deposit_rounds_down() {
        let quote = quote_deposit(3, 7, 5, 2, 100).unwrap();

        // 2 * 7 / 3 = 4, 2 * 5 / 3 = 3
        assert_eq!(quote, DepositQuote { used_a: 2, used_b: 4, minted_shares: 3 });
    }

    #[test]
    fn deposit_rejects_zero_and_empty_reserve() {
        assert_eq!(quote_deposit(10, 10, 10, 0, 5), Err(custom(AmmError::ZeroAmount)));
        assert_eq!(quote_deposit(0, 10, 10, 5, 5), Err(custom(AmmError::EmptyReserve)));
    }

    #[test]
    fn withdraw_is_proportional() {
        let quote = quote_withdraw(1_500, 6_000, 3_000, 1_000).unwrap();

        assert_eq!(quote, WithdrawQuote { out_a: 500, out_b: 2_000 });
    }

    #[test]
    fn withdraw_never_exceeds_reserves() {
        for burn in [1, 2, 999, 1_000, 2_999, 3_000] {
            let quote = quote_withdraw(1_501, 6_007, 3_000, burn).unwrap();
            assert!(quote.out_a <= 1_501);
            assert!(quote.out_b <= 6_007);
        }

        assert_eq!(quote_withdraw(10, 10, 3, 4), Err(custom(AmmError::InsufficientShares)));
    }

    #[test]
    fn exact_input_prices_at_spot_ratio_after_fee() {
        assert_eq!(quote_exact_input(1_500, 6_000, 100, 1, 50), Ok(396));
    }

    #[test]
    fn exact_input_size_cap_is_on_input_reserve() {
        assert_eq!(quote_exact_input(1_500, 6_000, 750, 1, 50).map(|_| ()), Ok(()));
        assert_eq!(
            quote_exact_input(1_500, 6_000, 751, 1, 50),
            Err(custom(AmmError::ExceedsMaxSwap)),
        );
    }

    #[test]
    fn exact_input_fee_is_monotone_and_strict() {
        let mut previous = 0;

        for amount_in in 1..=750u64 {
            let out = quote_exact_input(1_500, 6_000, amount_in, 3, 50).unwrap();
            let fee_free = amount_in * 6_000 / 1_500;

            assert!(out >= previous);
            assert!(out < fee_free);
            previous = out;
        }
    }

    #[test]
    fn exact_output_grosses_up_for_fee() {
        // raw = 396 * 1500 / 6000 = 99, gross = 99 * 101 / 100 = 99
        assert_eq!(quote_exact_output(1_500, 6_000, 396, 1, 50), Ok(99));
        // raw = 2000 * 1500 / 6000 = 500, gross = 500 * 110 / 100 = 550
        assert_eq!(quote_exact_output(1_500, 6_000, 2_000, 10, 50), Ok(550));
    }

    #[test]
    fn exact_output_rejects_outputs_that_price_to_zero() {
        // raw = 3 * 1500 / 6000 = 0
        assert_eq!(quote_exact_output(1_500, 6_000, 3, 1, 50), Err(custom(AmmError::ZeroAmount)));
        assert_eq!(quote_exact_output(1_500, 6_000, 4, 1, 50), Ok(1));
    }

    #[test]
    fn exact_output_size_cap_is_on_output_reserve() {
        // 10% of the output reserve is 600, even though 10% of input is only 150
        assert!(quote_exact_output(1_500, 6_000, 600, 0, 10).is_ok());
        assert_eq!(
            quote_exact_output(1_500, 6_000, 601, 0, 10),
            Err(custom(AmmError::ExceedsMaxSwap)),
        );
    }

    #[test]
    fn round_trip_loses_to_fees() {
        let (reserve_a, reserve_b) = (1_500, 6_000);

        for amount_out in [4, 40, 400, 1_000] {
            let paid_a = quote_exact_output(reserve_a, reserve_b, amount_out, 2, 50).unwrap();
            let back_a = quote_exact_input(reserve_b, reserve_a, amount_out, 2, 50).unwrap();

            assert!(back_a <= paid_a);
        }
    }

    #[test]
    fn empty_pool_cannot_be_swapped() {
        assert_eq!(quote_exact_input(0, 0, 1, 0, 100), Err(custom(AmmError::ExceedsMaxSwap)));
        assert_eq!(quote_exact_output(0, 0, 1, 0, 100), Err(custom(AmmError::ExceedsMaxSwap)));
    }
}
