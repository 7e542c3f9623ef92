//! Batched claims match individual claims

mod common;

use boardroom_core::prelude::*;
use boardroom_distributor::FeeDistributor;
use common::*;

/// Three equal eight-period locks; the distributor starts a period later and
/// receives 10 coin_a five periods after that
fn scenario() -> (Deployment, FeeDistributor) {
    let env = Deployment::new();
    let amount = 1_000 * ONE;
    let admin = env.admin();

    for account in &env.accounts[..3] {
        if *account != admin {
            env.fund(account, amount);
        }
        env.lock(account, amount, 8 * PERIOD);
    }

    env.clock.advance(PERIOD);
    let start_time = env.now();
    let mut distributor = env.distributor(admin);
    distributor.add_token(&admin, env.coin_a, start_time).unwrap();
    env.clock.sleep(5 * PERIOD);

    env.mint(&env.coin_a, &distributor.address(), 10 * ONE);
    distributor.checkpoint_token(&admin, &env.coin_a).unwrap();
    env.clock.sleep(PERIOD);
    distributor.checkpoint_token(&admin, &env.coin_a).unwrap();

    (env, distributor)
}

#[test]
fn test_claim_many() {
    let (env, mut distributor) = scenario();
    let trio = &env.accounts[..3];
    let paid = distributor
        .claim_many(&trio[0], &env.coin_a, &batch(trio))
        .unwrap();
    let batched: Vec<u128> = trio.iter().map(|a| env.balance(&env.coin_a, a)).collect();

    let (twin, mut twin_distributor) = scenario();
    for account in &twin.accounts[..3] {
        twin_distributor
            .claim(account, &twin.coin_a, account)
            .unwrap();
    }
    let individual: Vec<u128> = twin.accounts[..3]
        .iter()
        .map(|a| twin.balance(&twin.coin_a, a))
        .collect();

    assert_eq!(batched, individual);
    assert_eq!(paid, batched.iter().sum::<u128>());
    assert!(paid > 0);
    assert_eq!(
        distributor.token_last_balance(&env.coin_a),
        twin_distributor.token_last_balance(&twin.coin_a)
    );
}

#[test]
fn test_claim_many_same_account() {
    let (twin, mut twin_distributor) = scenario();
    let alice = twin.accounts[0];
    let expected = twin_distributor
        .claim(&alice, &twin.coin_a, &alice)
        .unwrap();

    let (env, mut distributor) = scenario();
    let alice = env.accounts[0];
    distributor
        .claim_many(&alice, &env.coin_a, &[alice; CLAIM_MANY_BATCH])
        .unwrap();

    assert!(expected > 0);
    assert_eq!(env.balance(&env.coin_a, &alice), expected);
}

#[test]
fn test_claim_many_all_padding() {
    let (env, mut distributor) = scenario();
    let paid = distributor
        .claim_many(&env.admin(), &env.coin_a, &[AccountId::ZERO; CLAIM_MANY_BATCH])
        .unwrap();
    assert_eq!(paid, 0);
    assert_eq!(env.balance(&env.coin_a, &AccountId::ZERO), 0);
}

#[test]
fn test_claim_many_then_claim_pays_nothing_more() {
    let (env, mut distributor) = scenario();
    let trio = &env.accounts[..3];
    distributor
        .claim_many(&trio[0], &env.coin_a, &batch(trio))
        .unwrap();

    for account in trio {
        assert_eq!(distributor.claim(account, &env.coin_a, account).unwrap(), 0);
    }
}
