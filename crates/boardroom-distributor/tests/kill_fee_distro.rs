//! Kill switch and ownership

mod common;

use boardroom_core::prelude::*;
use boardroom_distributor::FeeDistributor;
use common::*;

/// Coins a, c, b registered, c deleted; emergency return is `accounts[1]`
fn setup() -> (Deployment, FeeDistributor) {
    let env = Deployment::new();
    let admin = env.admin();
    let mut distributor = env.distributor(env.accounts[1]);
    let now = env.now();
    distributor.add_token(&admin, env.coin_a, now).unwrap();
    distributor.add_token(&admin, env.coin_c, now).unwrap();
    distributor.add_token(&admin, env.coin_b, now).unwrap();
    distributor.delete_token(&admin, &env.coin_c).unwrap();
    (env, distributor)
}

#[test]
fn test_assumptions() {
    let (env, distributor) = setup();
    assert!(!distributor.is_killed());
    assert_eq!(distributor.emergency_return(), env.accounts[1]);
    assert_eq!(distributor.tokens(), vec![env.coin_a, env.coin_b]);
}

#[test]
fn test_kill() {
    let (env, mut distributor) = setup();
    distributor.kill_me(&env.admin()).unwrap();
    assert!(distributor.is_killed());
}

#[test]
fn test_multi_kill() {
    let (env, mut distributor) = setup();
    distributor.kill_me(&env.admin()).unwrap();
    distributor.kill_me(&env.admin()).unwrap();
    assert!(distributor.is_killed());
}

#[test]
fn test_killing_xfers_tokens() {
    let (env, mut distributor) = setup();
    let address = distributor.address();
    env.mint(&env.coin_a, &address, 31_337);
    env.mint(&env.coin_b, &address, 1_337);

    distributor.kill_me(&env.admin()).unwrap();

    assert_eq!(distributor.emergency_return(), env.accounts[1]);
    assert_eq!(env.balance(&env.coin_a, &env.accounts[1]), 31_337);
    assert_eq!(env.balance(&env.coin_b, &env.accounts[1]), 1_337);
}

#[test]
fn test_kill_skips_deleted_token() {
    let (env, mut distributor) = setup();
    let address = distributor.address();
    env.mint(&env.coin_c, &address, 500);

    distributor.kill_me(&env.admin()).unwrap();

    assert_eq!(env.balance(&env.coin_c, &address), 500);
    assert_eq!(env.balance(&env.coin_c, &env.accounts[1]), 0);
}

#[test]
fn test_multi_kill_token_xfer() {
    let (env, mut distributor) = setup();
    let address = distributor.address();
    env.mint(&env.coin_a, &address, 10_000);
    env.mint(&env.coin_b, &address, 1_000);
    distributor.kill_me(&env.admin()).unwrap();

    env.mint(&env.coin_a, &address, 30_000);
    env.mint(&env.coin_b, &address, 3_000);
    distributor.kill_me(&env.admin()).unwrap();

    assert_eq!(distributor.emergency_return(), env.accounts[1]);
    assert_eq!(env.balance(&env.coin_a, &env.accounts[1]), 40_000);
    assert_eq!(env.balance(&env.coin_b, &env.accounts[1]), 4_000);
}

#[test]
fn test_only_admin() {
    for idx in 1..3 {
        let (env, mut distributor) = setup();
        let caller = env.accounts[idx];
        assert_eq!(
            distributor.kill_me(&caller),
            Err(BoardroomError::Unauthorized(caller))
        );
        assert!(!distributor.is_killed());
    }
}

#[test]
fn test_cannot_claim_after_killed() {
    for idx in 1..3 {
        let (env, mut distributor) = setup();
        distributor.kill_me(&env.admin()).unwrap();
        let caller = env.accounts[idx];

        for coin in [env.coin_a, env.coin_b] {
            assert_eq!(
                distributor.claim(&caller, &coin, &caller),
                Err(BoardroomError::Killed)
            );
        }
    }
}

#[test]
fn test_cannot_claim_for_after_killed() {
    for idx in 1..3 {
        let (env, mut distributor) = setup();
        distributor.kill_me(&env.admin()).unwrap();
        let caller = env.accounts[idx];
        let alice = env.accounts[0];

        for coin in [env.coin_a, env.coin_b] {
            assert_eq!(
                distributor.claim(&caller, &coin, &alice),
                Err(BoardroomError::Killed)
            );
        }
    }
}

#[test]
fn test_cannot_claim_many_after_killed() {
    for idx in 1..3 {
        let (env, mut distributor) = setup();
        distributor.kill_me(&env.admin()).unwrap();
        let caller = env.accounts[idx];
        let alice = env.accounts[0];

        for coin in [env.coin_a, env.coin_b] {
            assert_eq!(
                distributor.claim_many(&caller, &coin, &[alice; CLAIM_MANY_BATCH]),
                Err(BoardroomError::Killed)
            );
        }
    }
}

mod ownership {
    use super::*;

    #[test]
    fn test_commit_admin_only() {
        let (env, mut distributor) = setup();
        let other = env.accounts[1];
        assert!(distributor.commit_transfer_ownership(&other, other).is_err());
    }

    #[test]
    fn test_apply_admin_only() {
        let (env, mut distributor) = setup();
        let other = env.accounts[1];
        assert!(distributor.apply_transfer_ownership(&other).is_err());
    }

    #[test]
    fn test_transfer_moves_admin_rights() {
        let (env, mut distributor) = setup();
        let (admin, other) = (env.admin(), env.accounts[1]);

        distributor.commit_transfer_ownership(&admin, other).unwrap();
        assert_eq!(distributor.admin(), admin);
        assert_eq!(distributor.future_admin(), Some(other));

        distributor.apply_transfer_ownership(&admin).unwrap();
        assert_eq!(distributor.admin(), other);

        assert!(distributor.toggle_allow_checkpoint_token(&admin).is_err());
        assert!(distributor.toggle_allow_checkpoint_token(&other).unwrap());
    }

    #[test]
    fn test_apply_without_commit() {
        let (env, mut distributor) = setup();
        assert_eq!(
            distributor.apply_transfer_ownership(&env.admin()),
            Err(BoardroomError::NoPendingTransfer)
        );
    }
}

mod registry {
    use super::*;

    #[test]
    fn test_only_admin_adds_tokens() {
        for idx in 1..3 {
            let env = Deployment::new();
            let mut distributor = env.distributor(env.admin());
            let caller = env.accounts[idx];
            assert!(matches!(
                distributor.add_token(&caller, env.coin_a, env.now()),
                Err(BoardroomError::Unauthorized(_))
            ));
        }
    }

    #[test]
    fn test_admin_can_add_token() {
        let env = Deployment::new();
        let mut distributor = env.distributor(env.admin());
        distributor
            .add_token(&env.admin(), env.coin_a, env.now())
            .unwrap();
        assert_eq!(distributor.tokens()[0], env.coin_a);
        assert_eq!(distributor.start_time(&env.coin_a), Some(period_floor(env.now())));
    }

    #[test]
    fn test_duplicate_and_missing_tokens() {
        let (env, mut distributor) = setup();
        let admin = env.admin();
        assert_eq!(
            distributor.add_token(&admin, env.coin_a, env.now()),
            Err(BoardroomError::AlreadyRegistered(env.coin_a))
        );
        assert_eq!(
            distributor.delete_token(&admin, &env.coin_c),
            Err(BoardroomError::NotRegistered(env.coin_c))
        );
        assert_eq!(
            distributor.claim(&admin, &env.coin_c, &admin),
            Err(BoardroomError::NotRegistered(env.coin_c))
        );
    }

    /// Fees attributed to periods `[from, to]`
    fn bucketed(distributor: &FeeDistributor, token: &TokenId, from: Timestamp, to: Timestamp) -> u128 {
        (0..)
            .map(|i| from + i * PERIOD)
            .take_while(|p| *p <= to)
            .map(|p| distributor.tokens_per_week(token, p))
            .sum()
    }

    /// Alice locks at genesis; 100 coins land in the period after genesis and
    /// that period is made final
    fn funded() -> (Deployment, FeeDistributor, AccountId) {
        let env = Deployment::new();
        let admin = env.admin();
        let alice = env.accounts[1];
        env.fund(&alice, 1_000 * ONE);
        env.lock(&alice, 1_000 * ONE, 8 * PERIOD);

        let mut distributor = env.distributor(admin);
        distributor.add_token(&admin, env.coin_a, env.now()).unwrap();

        env.clock.advance(PERIOD);
        distributor.checkpoint_token(&admin, &env.coin_a).unwrap();
        env.mint(&env.coin_a, &distributor.address(), 100 * ONE);
        distributor.checkpoint_token(&admin, &env.coin_a).unwrap();
        (env, distributor, alice)
    }

    #[test]
    fn test_claim_across_readd() {
        let (env, mut distributor, alice) = funded();
        let admin = env.admin();
        let coin = env.coin_a;

        // Pins alice's cursor before the fees are final
        assert_eq!(distributor.claim(&alice, &coin, &alice).unwrap(), 0);

        env.clock.advance(PERIOD);
        distributor.checkpoint_token(&admin, &coin).unwrap();
        distributor.delete_token(&admin, &coin).unwrap();
        distributor.add_token(&admin, coin, env.now()).unwrap();
        assert_eq!(distributor.token_last_balance(&coin), Some(100 * ONE));
        assert_eq!(distributor.start_time(&coin), Some(period_floor(env.now())));

        distributor.checkpoint_token(&admin, &coin).unwrap();
        let held = env.balance(&coin, &distributor.address());
        assert_eq!(bucketed(&distributor, &coin, period_floor(GENESIS), env.now()), held);

        assert_eq!(distributor.claim(&alice, &coin, &alice).unwrap(), 100 * ONE);
        assert_eq!(env.balance(&coin, &alice), 100 * ONE);
        assert_eq!(env.balance(&coin, &distributor.address()), 0);
        assert_eq!(distributor.token_last_balance(&coin), Some(0));
    }

    #[test]
    fn test_readd_does_not_reattribute() {
        let (env, mut distributor, alice) = funded();
        let admin = env.admin();
        let coin = env.coin_a;

        env.clock.advance(PERIOD);
        distributor.checkpoint_token(&admin, &coin).unwrap();
        distributor.delete_token(&admin, &coin).unwrap();
        distributor.add_token(&admin, coin, env.now()).unwrap();

        env.clock.advance(PERIOD);
        distributor.checkpoint_token(&admin, &coin).unwrap();
        let start = period_floor(GENESIS);
        assert_eq!(bucketed(&distributor, &coin, start, env.now()), 100 * ONE);

        // Alice had no cursor yet, so she starts at the new start time and the
        // earlier period stays with the distributor
        let paid = distributor.claim(&alice, &coin, &alice).unwrap();
        let held = env.balance(&coin, &distributor.address());
        assert_eq!(paid + held, 100 * ONE);
        assert!(bucketed(&distributor, &coin, start, env.now()) <= held + paid);
    }
}
