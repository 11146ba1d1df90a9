use anchor_spl::token_2022;
use asset_redemption::error::RedemptionError;
use asset_redemption::events::{AssetTokenBurned, AssetTokenReturned, RedemptionInitiated};
use asset_redemption::state::RedemptionRecord;
use asset_redemption::CUSTODY_VAULT_LEN;
use fuzz_helpers::*;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signer;

fn assert_program_error(result: Result<(), BanksClientError>, expected: RedemptionError) {
    let err = result.expect_err("instruction should have been rejected");
    assert_eq!(
        custom_error_code(&err),
        Some(u32::from(expected)),
        "unexpected failure: {:?}",
        err
    );
}

async fn initiate(env: &mut FuzzTestEnv, setup: &CompleteSetup) -> Result<(), BanksClientError> {
    initiate_with(env, setup, &setup.ix_accounts()).await
}

async fn initiate_with(
    env: &mut FuzzTestEnv,
    setup: &CompleteSetup,
    accounts: &RedemptionIxAccounts,
) -> Result<(), BanksClientError> {
    let ix = initialize_redemption_ix(&env.program_id, accounts);
    send_instruction(&mut env.context, ix, &[&setup.customer.owner]).await
}

async fn return_asset(env: &mut FuzzTestEnv, accounts: &RedemptionIxAccounts) -> Result<(), BanksClientError> {
    let ix = return_asset_token_ix(&env.program_id, accounts);
    send_instruction(&mut env.context, ix, &[]).await
}

async fn burn_asset(env: &mut FuzzTestEnv, accounts: &RedemptionIxAccounts) -> Result<(), BanksClientError> {
    let ix = burn_asset_token_ix(&env.program_id, accounts);
    send_instruction(&mut env.context, ix, &[]).await
}

const PENDING: LedgerSnapshot = LedgerSnapshot {
    supply: 1,
    customer_balance: 0,
    vault_balance: Some(1),
    record_exists: true,
};

#[tokio::test]
async fn initiate_then_return_restores_the_customer() {
    let (mut env, setup) = setup_complete_environment(1).await.unwrap();

    initiate(&mut env, &setup).await.unwrap();
    assert_eq!(snapshot(&mut env.context, &setup).await.unwrap(), PENDING);

    let record = get_redemption_record(&mut env.context, &setup.redemption.redemption_record)
        .await
        .unwrap();
    assert_eq!(record.mint, setup.asset.mint);
    assert_eq!(record.customer_token_account, setup.customer.token_account);
    assert_eq!(record.customer_payment_account, setup.customer.owner.pubkey());
    assert_eq!(record.custody_vault, setup.redemption.custody_vault);
    assert_eq!(record.custody_bump, setup.redemption.custody_bump);
    assert_eq!(record.record_bump, setup.redemption.record_bump);

    let ix = return_asset_token_ix(&env.program_id, &setup.ix_accounts());
    let logs = send_instruction_with_logs(&mut env.context, ix, &[]).await.unwrap();
    let returned = emitted_events::<AssetTokenReturned>(&logs);
    assert_eq!(returned.len(), 1);
    assert_eq!(returned[0].mint, setup.asset.mint);
    assert_eq!(returned[0].customer_token_account, setup.customer.token_account);
    assert_eq!(returned[0].refund_to, setup.customer.owner.pubkey());

    assert_eq!(
        snapshot(&mut env.context, &setup).await.unwrap(),
        LedgerSnapshot {
            supply: 1,
            customer_balance: 1,
            vault_balance: None,
            record_exists: false,
        }
    );
}

#[tokio::test]
async fn initiate_then_burn_destroys_the_unit() {
    let (mut env, setup) = setup_complete_environment(1).await.unwrap();
    let accounts = setup.ix_accounts();
    let customer = setup.customer.owner.pubkey();

    let ix = initialize_redemption_ix(&env.program_id, &accounts);
    let logs = send_instruction_with_logs(&mut env.context, ix, &[&setup.customer.owner])
        .await
        .unwrap();
    let initiated = emitted_events::<RedemptionInitiated>(&logs);
    assert_eq!(initiated.len(), 1);
    assert_eq!(initiated[0].mint, setup.asset.mint);
    assert_eq!(initiated[0].customer_token_account, setup.customer.token_account);
    assert_eq!(initiated[0].customer_payment_account, customer);
    assert_eq!(initiated[0].custody_vault, setup.redemption.custody_vault);

    let ix = burn_asset_token_ix(&env.program_id, &accounts);
    let logs = send_instruction_with_logs(&mut env.context, ix, &[]).await.unwrap();
    let burned = emitted_events::<AssetTokenBurned>(&logs);
    assert_eq!(burned.len(), 1);
    assert_eq!(burned[0].mint, setup.asset.mint);
    assert_eq!(burned[0].remaining_supply, 0);
    assert_eq!(burned[0].refund_to, customer);
    assert!(emitted_events::<AssetTokenReturned>(&logs).is_empty());
    assert!(logs.iter().any(|line| line.contains("Remaining supply: 0")));

    assert_eq!(
        snapshot(&mut env.context, &setup).await.unwrap(),
        LedgerSnapshot {
            supply: 0,
            customer_balance: 0,
            vault_balance: None,
            record_exists: false,
        }
    );
}

#[tokio::test]
async fn second_initiate_is_rejected_while_pending() {
    let (mut env, setup) = setup_complete_environment(1).await.unwrap();

    initiate(&mut env, &setup).await.unwrap();
    assert_program_error(
        initiate(&mut env, &setup).await,
        RedemptionError::RedemptionAlreadyPending,
    );
    assert_eq!(snapshot(&mut env.context, &setup).await.unwrap(), PENDING);
}

#[tokio::test]
async fn mismatched_accounts_cannot_resolve() {
    let (mut env, setup) = setup_complete_environment(1).await.unwrap();
    let stranger = setup_customer(&mut env.context, &setup.asset.mint).await.unwrap();

    initiate(&mut env, &setup).await.unwrap();

    let genuine = setup.ix_accounts();
    let spoofs = [
        RedemptionIxAccounts {
            customer_token_account: stranger.token_account,
            ..genuine
        },
        RedemptionIxAccounts {
            customer_payment_account: stranger.owner.pubkey(),
            ..genuine
        },
        RedemptionIxAccounts {
            custody_vault: Pubkey::new_unique(),
            ..genuine
        },
        // Addresses that are not token or wallet accounts at all
        RedemptionIxAccounts {
            customer_token_account: Pubkey::new_unique(),
            ..genuine
        },
        RedemptionIxAccounts {
            customer_payment_account: genuine.asset_mint,
            ..genuine
        },
        RedemptionIxAccounts {
            customer_token_account: genuine.custody_vault,
            ..genuine
        },
    ];

    for spoof in &spoofs {
        assert_program_error(
            return_asset(&mut env, spoof).await,
            RedemptionError::AuthorizationMismatch,
        );
        assert_program_error(
            burn_asset(&mut env, spoof).await,
            RedemptionError::AuthorizationMismatch,
        );
        assert_eq!(snapshot(&mut env.context, &setup).await.unwrap(), PENDING);
    }

    // The genuine account set still resolves afterwards
    return_asset(&mut env, &genuine).await.unwrap();
}

#[tokio::test]
async fn full_cycle_reuses_the_derived_addresses() {
    let (mut env, setup) = setup_complete_environment(1).await.unwrap();
    let accounts = setup.ix_accounts();

    initiate(&mut env, &setup).await.unwrap();
    return_asset(&mut env, &accounts).await.unwrap();
    initiate(&mut env, &setup).await.unwrap();
    assert_eq!(snapshot(&mut env.context, &setup).await.unwrap(), PENDING);
    burn_asset(&mut env, &accounts).await.unwrap();

    let end = snapshot(&mut env.context, &setup).await.unwrap();
    assert_eq!(end.supply, 0);
    assert!(!end.record_exists);
    assert_eq!(end.vault_balance, None);
}

#[tokio::test]
async fn burned_asset_cannot_enter_redemption_again() {
    let (mut env, setup) = setup_complete_environment(1).await.unwrap();

    initiate(&mut env, &setup).await.unwrap();
    burn_asset(&mut env, &setup.ix_accounts()).await.unwrap();

    assert_program_error(
        initiate(&mut env, &setup).await,
        RedemptionError::SupplyInvariantViolation,
    );
}

#[tokio::test]
async fn initiate_requires_a_single_unit_supply() {
    let (mut env, setup) = setup_complete_environment(2).await.unwrap();

    assert_program_error(
        initiate(&mut env, &setup).await,
        RedemptionError::SupplyInvariantViolation,
    );
    assert!(!account_exists(&mut env.context, &setup.redemption.redemption_record).await.unwrap());
    assert!(!account_exists(&mut env.context, &setup.redemption.custody_vault).await.unwrap());
    assert_eq!(get_token_balance(&mut env.context, &setup.customer.token_account).await.unwrap(), 2);
}

#[tokio::test]
async fn initiate_requires_an_indivisible_mint() {
    let mut env = setup_program_test().await;
    let asset = setup_asset_mint(&mut env.context, 6).await.unwrap();
    let customer = setup_customer(&mut env.context, &asset.mint).await.unwrap();
    mint_asset_to(
        &mut env.context,
        &asset.mint,
        &asset.mint_authority,
        &customer.token_account,
        1,
    )
    .await
    .unwrap();

    let setup = CompleteSetup {
        redemption: derive_redemption_accounts(&asset.mint),
        asset,
        customer,
    };

    assert_program_error(
        initiate(&mut env, &setup).await,
        RedemptionError::SupplyInvariantViolation,
    );
}

#[tokio::test]
async fn initiate_requires_the_customer_to_hold_the_unit() {
    let (mut env, setup) = setup_complete_environment(0).await.unwrap();
    let holder = setup_customer(&mut env.context, &setup.asset.mint).await.unwrap();
    mint_asset_to(
        &mut env.context,
        &setup.asset.mint,
        &setup.asset.mint_authority,
        &holder.token_account,
        1,
    )
    .await
    .unwrap();

    assert_program_error(
        initiate(&mut env, &setup).await,
        RedemptionError::InsufficientBalance,
    );
    assert!(!account_exists(&mut env.context, &setup.redemption.redemption_record).await.unwrap());
}

#[tokio::test]
async fn initiate_rejects_token_accounts_the_customer_does_not_own() {
    let (mut env, setup) = setup_complete_environment(1).await.unwrap();
    let genuine = setup.ix_accounts();

    // Same mint, held by another wallet
    let stranger = setup_customer(&mut env.context, &setup.asset.mint).await.unwrap();
    let foreign_owner = RedemptionIxAccounts {
        customer_token_account: stranger.token_account,
        ..genuine
    };
    assert_program_error(
        initiate_with(&mut env, &setup, &foreign_owner).await,
        RedemptionError::AuthorizationMismatch,
    );

    // Holding account for a different mint
    let other_asset = setup_asset_mint(&mut env.context, 0).await.unwrap();
    let other_holder = setup_customer(&mut env.context, &other_asset.mint).await.unwrap();
    let foreign_mint = RedemptionIxAccounts {
        customer_token_account: other_holder.token_account,
        ..genuine
    };
    assert_program_error(
        initiate_with(&mut env, &setup, &foreign_mint).await,
        RedemptionError::AuthorizationMismatch,
    );

    assert!(!account_exists(&mut env.context, &setup.redemption.redemption_record).await.unwrap());
    assert_eq!(get_token_balance(&mut env.context, &setup.customer.token_account).await.unwrap(), 1);
}

#[tokio::test]
async fn resolution_requires_the_vaults_token_program() {
    let (mut env, setup) = setup_complete_environment(1).await.unwrap();
    let accounts = setup.ix_accounts();

    initiate(&mut env, &setup).await.unwrap();

    let ix = with_token_program(return_asset_token_ix(&env.program_id, &accounts), token_2022::ID);
    assert_program_error(
        send_instruction(&mut env.context, ix, &[]).await,
        RedemptionError::TokenProgramMismatch,
    );
    let ix = with_token_program(burn_asset_token_ix(&env.program_id, &accounts), token_2022::ID);
    assert_program_error(
        send_instruction(&mut env.context, ix, &[]).await,
        RedemptionError::TokenProgramMismatch,
    );

    assert_eq!(snapshot(&mut env.context, &setup).await.unwrap(), PENDING);
}

#[tokio::test]
async fn initiate_rejects_non_derived_addresses() {
    let (mut env, setup) = setup_complete_environment(1).await.unwrap();
    let genuine = setup.ix_accounts();

    let wrong_record = RedemptionIxAccounts {
        redemption_record: Pubkey::new_unique(),
        ..genuine
    };
    assert_program_error(
        initiate_with(&mut env, &setup, &wrong_record).await,
        RedemptionError::DerivationMismatch,
    );

    let swapped = RedemptionIxAccounts {
        redemption_record: genuine.custody_vault,
        custody_vault: genuine.redemption_record,
        ..genuine
    };
    assert_program_error(
        initiate_with(&mut env, &setup, &swapped).await,
        RedemptionError::DerivationMismatch,
    );

    assert_eq!(get_token_balance(&mut env.context, &setup.customer.token_account).await.unwrap(), 1);
}

#[tokio::test]
async fn resolving_without_a_pending_redemption_fails() {
    let (mut env, setup) = setup_complete_environment(1).await.unwrap();
    let accounts = setup.ix_accounts();

    assert_program_error(
        return_asset(&mut env, &accounts).await,
        RedemptionError::RecordNotFound,
    );
    assert_program_error(
        burn_asset(&mut env, &accounts).await,
        RedemptionError::RecordNotFound,
    );

    // Resolving twice hits the same wall
    initiate(&mut env, &setup).await.unwrap();
    return_asset(&mut env, &accounts).await.unwrap();
    assert_program_error(
        burn_asset(&mut env, &accounts).await,
        RedemptionError::RecordNotFound,
    );
}

#[tokio::test]
async fn storage_deposits_are_refunded_to_the_customer() {
    let (mut env, setup) = setup_complete_environment(1).await.unwrap();
    let customer = setup.customer.owner.pubkey();

    let rent = env.context.banks_client.get_rent().await.unwrap();
    let deposits =
        rent.minimum_balance(CUSTODY_VAULT_LEN) + rent.minimum_balance(RedemptionRecord::LEN);

    let before = get_lamports(&mut env.context, &customer).await.unwrap();

    initiate(&mut env, &setup).await.unwrap();
    assert_eq!(
        get_lamports(&mut env.context, &customer).await.unwrap(),
        before - deposits
    );

    return_asset(&mut env, &setup.ix_accounts()).await.unwrap();
    assert_eq!(get_lamports(&mut env.context, &customer).await.unwrap(), before);

    initiate(&mut env, &setup).await.unwrap();
    burn_asset(&mut env, &setup.ix_accounts()).await.unwrap();
    assert_eq!(get_lamports(&mut env.context, &customer).await.unwrap(), before);
}
