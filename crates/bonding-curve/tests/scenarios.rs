use bonding_curve::{CurrencyAccounts, CurveConfig, Exchange, ExchangeError, ManualClock};
use curve_core::Amount;
use curve_crypto::Address;
use std::sync::Arc;

fn currency(s: &str) -> Amount {
    Amount::from_decimal_str(s).unwrap()
}

fn units(n: u64) -> Amount {
    Amount::from_u64(n)
}

fn new_exchange(start: u64) -> (Exchange, ManualClock) {
    let clock = ManualClock::new(start);
    let exchange = Exchange::new(
        &CurveConfig::from_decimal("0.01", 60).unwrap(),
        Address::derive(b"deployer"),
        CurrencyAccounts::new(),
        Arc::new(clock.clone()),
    ).unwrap();
    (exchange, clock)
}

#[test]
fn test_quotes_from_empty_supply() {
    let (exchange, _) = new_exchange(1_700_000_000);

    assert_eq!(exchange.quote_buy(&units(1)).unwrap(), currency("0.01"));
    assert_eq!(exchange.quote_buy(&units(2)).unwrap(), currency("0.03"));
    assert_eq!(exchange.quote_buy(&units(10)).unwrap(), currency("0.55"));
}

#[test]
fn test_sell_quotes_after_buying_two() {
    let (mut exchange, _) = new_exchange(1_700_000_000);
    let buyer = Address::derive(b"buyer");

    exchange.buy(buyer, &units(2), &currency("0.03"), &currency("0.03")).unwrap();

    assert_eq!(exchange.quote_sell(&units(1)).unwrap(), currency("0.02"));
    assert_eq!(exchange.quote_sell(&units(2)).unwrap(), currency("0.03"));
}

#[test]
fn test_buy_with_tight_bound_is_rejected() {
    let (mut exchange, _) = new_exchange(1_700_000_000);
    let buyer = Address::derive(b"buyer");

    let err = exchange
        .buy(buyer, &units(2), &currency("0.02"), &currency("0.03"))
        .unwrap_err();

    match err {
        ExchangeError::SlippageExceeded { quoted, bound } => {
            assert_eq!(quoted, currency("0.03"));
            assert_eq!(bound, currency("0.02"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(exchange.balance_of(&buyer).is_zero());
    assert!(exchange.total_supply().is_zero());
    assert!(exchange.treasury_balance().is_zero());
}

#[test]
fn test_sell_waits_for_cooldown() {
    let start = 1_700_000_000;
    let (mut exchange, clock) = new_exchange(start);
    let trader = Address::derive(b"trader");

    exchange.buy(trader, &units(1), &currency("0.01"), &currency("0.01")).unwrap();

    clock.set(start + 30);
    let err = exchange.sell(trader, &units(1), &Amount::zero()).unwrap_err();
    assert!(matches!(
        err,
        ExchangeError::RateLimited { retry_at, .. } if retry_at == start + 60
    ));
    assert_eq!(exchange.balance_of(&trader), units(1));

    clock.set(start + 60);
    let receipt = exchange.sell(trader, &units(1), &Amount::zero()).unwrap();
    assert_eq!(receipt.payout, currency("0.01"));
    assert!(exchange.balance_of(&trader).is_zero());
    assert!(exchange.total_supply().is_zero());
}

#[test]
fn test_consecutive_sells_are_spaced_by_cooldown() {
    let start = 1_700_000_000;
    let (mut exchange, clock) = new_exchange(start);
    let trader = Address::derive(b"trader");
    let other = Address::derive(b"other");

    exchange.buy(trader, &units(3), &currency("0.06"), &currency("0.06")).unwrap();

    clock.set(start + 60);
    exchange.sell(trader, &units(1), &Amount::zero()).unwrap();

    clock.set(start + 119);
    assert!(matches!(
        exchange.sell(trader, &units(1), &Amount::zero()),
        Err(ExchangeError::RateLimited { .. })
    ));

    // Cooldowns are tracked per account
    exchange.buy(other, &units(1), &currency("0.03"), &currency("0.03")).unwrap();
    assert_eq!(exchange.last_action(&trader), Some(start + 60));

    clock.set(start + 120);
    assert!(exchange.sell(trader, &units(1), &Amount::zero()).is_ok());
}

#[test]
fn test_buy_two_sell_one_after_cooldown() {
    let start = 1_700_000_000;
    let (mut exchange, clock) = new_exchange(start);
    let trader = Address::derive(b"trader");

    let buy = exchange.buy(trader, &units(2), &currency("0.03"), &currency("0.03")).unwrap();
    assert_eq!(buy.cost, currency("0.03"));

    clock.advance(60);
    let sell = exchange.sell(trader, &units(1), &currency("0.02")).unwrap();
    assert_eq!(sell.payout, currency("0.02"));
    assert_eq!(exchange.balance_of(&trader), units(1));
    assert_eq!(exchange.transfers().received(&trader), currency("0.02"));
    assert_eq!(exchange.treasury_balance(), &currency("0.01"));
}

#[test]
fn test_admin_drains_treasury() {
    let (mut exchange, _) = new_exchange(1_700_000_000);
    let admin = Address::derive(b"deployer");
    let trader = Address::derive(b"trader");

    exchange.buy(trader, &units(10), &currency("0.55"), &currency("1")).unwrap();
    assert_eq!(exchange.transfers().received(&trader), currency("0.45"));

    assert!(matches!(
        exchange.withdraw(trader),
        Err(ExchangeError::Unauthorized { .. })
    ));
    assert_eq!(exchange.treasury_balance(), &currency("0.55"));

    assert_eq!(exchange.withdraw(admin).unwrap(), currency("0.55"));
    assert!(exchange.treasury_balance().is_zero());
    assert_eq!(exchange.transfers().received(&admin), currency("0.55"));
}
