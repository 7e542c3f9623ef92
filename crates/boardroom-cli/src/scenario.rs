//! Scenario configuration
//!
//! A scenario is a TOML file describing an in-memory deployment and an ordered
//! list of steps to run against it. Every section is optional.

use std::path::Path;

use anyhow::{bail, Context};
use boardroom_core::Timestamp;
use serde::{Deserialize, Serialize};

/// Complete scenario
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub chain: ChainConfig,

    #[serde(default)]
    pub tokens: TokenConfig,

    /// Account labels; the first one administers the ledger and distributor
    #[serde(default = "default_accounts")]
    pub accounts: Vec<String>,

    /// Receiver of the kill sweep (defaults to the admin)
    #[serde(default)]
    pub emergency_return: Option<String>,

    /// Initial balances
    #[serde(default, rename = "balance")]
    pub balances: Vec<Balance>,

    #[serde(default, rename = "step")]
    pub steps: Vec<Step>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Clock time at deployment
    #[serde(default = "default_genesis_time")]
    pub genesis_time: Timestamp,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            genesis_time: default_genesis_time(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Symbol of the token locked in the ledger
    #[serde(default = "default_base_token")]
    pub base: String,

    /// Reward token symbols, registered with the distributor at genesis
    #[serde(default = "default_reward_tokens")]
    pub rewards: Vec<String>,

    /// Decimal places used to read amounts
    #[serde(default = "default_decimals")]
    pub decimals: u32,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            base: default_base_token(),
            rewards: default_reward_tokens(),
            decimals: default_decimals(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Balance {
    pub account: String,
    pub token: String,
    pub amount: Amount,
}

/// Token amount in whole tokens, either an integer or a decimal string
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Amount {
    Whole(u64),
    Decimal(String),
}

impl Amount {
    /// Amount in base units
    pub fn to_units(&self, decimals: u32) -> anyhow::Result<u128> {
        let scale = 10u128
            .checked_pow(decimals)
            .context("too many decimals")?;
        match self {
            Amount::Whole(n) => (*n as u128)
                .checked_mul(scale)
                .context("amount overflows"),
            Amount::Decimal(s) => parse_decimal(s, decimals, scale),
        }
    }
}

fn parse_decimal(s: &str, decimals: u32, scale: u128) -> anyhow::Result<u128> {
    let s = s.trim();
    let (whole, frac) = s.split_once('.').unwrap_or((s, ""));
    if frac.len() > decimals as usize {
        bail!("{s}: more than {decimals} decimal places");
    }

    let whole: u128 = if whole.is_empty() {
        0
    } else {
        whole.parse().with_context(|| format!("invalid amount {s}"))?
    };
    let frac_units: u128 = if frac.is_empty() {
        0
    } else {
        let digits: u128 = frac.parse().with_context(|| format!("invalid amount {s}"))?;
        digits * 10u128.pow(decimals - frac.len() as u32)
    };

    whole
        .checked_mul(scale)
        .and_then(|w| w.checked_add(frac_units))
        .with_context(|| format!("{s}: amount overflows"))
}

/// One scenario step
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Move the clock forward (and mine a block)
    Sleep {
        #[serde(default)]
        periods: u64,
        #[serde(default)]
        days: u64,
        #[serde(default)]
        seconds: u64,
    },

    /// Lock until the period boundary at or before `now + periods`
    Lock {
        account: String,
        amount: Amount,
        periods: u64,
    },

    IncreaseAmount {
        account: String,
        amount: Amount,
    },

    /// Push the unlock time `periods` further out
    Extend {
        account: String,
        periods: u64,
    },

    Withdraw {
        account: String,
    },

    /// Send reward tokens to the distributor, minted unless `from` is given
    DepositFees {
        token: String,
        amount: Amount,
        #[serde(default)]
        from: Option<String>,
    },

    /// Token checkpoint, by the admin unless `caller` is given
    CheckpointToken {
        token: String,
        #[serde(default)]
        caller: Option<String>,
    },

    CheckpointTotalSupply,

    ToggleCheckpoint,

    Claim {
        account: String,
        token: String,
    },

    ClaimMany {
        accounts: Vec<String>,
        token: String,
    },

    Kill,
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::Sleep { .. } => "sleep",
            Step::Lock { .. } => "lock",
            Step::IncreaseAmount { .. } => "increase_amount",
            Step::Extend { .. } => "extend",
            Step::Withdraw { .. } => "withdraw",
            Step::DepositFees { .. } => "deposit_fees",
            Step::CheckpointToken { .. } => "checkpoint_token",
            Step::CheckpointTotalSupply => "checkpoint_total_supply",
            Step::ToggleCheckpoint => "toggle_checkpoint",
            Step::Claim { .. } => "claim",
            Step::ClaimMany { .. } => "claim_many",
            Step::Kill => "kill",
        }
    }
}

/// A period boundary, so locks created at genesis count from the first period
fn default_genesis_time() -> Timestamp {
    1_699_488_000
}

fn default_base_token() -> String {
    "KLONX".to_string()
}

fn default_reward_tokens() -> Vec<String> {
    vec!["USDA".to_string()]
}

fn default_decimals() -> u32 {
    18
}

fn default_accounts() -> Vec<String> {
    vec!["alice".to_string()]
}

impl Scenario {
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let scenario: Scenario = toml::from_str(content)?;
        if scenario.accounts.is_empty() {
            bail!("scenario needs at least one account");
        }
        Ok(scenario)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("parsing scenario {}", path.display()))
    }
}

/// Printed by `boardroom example`
pub const EXAMPLE: &str = r#"# Three holders lock the same amount at genesis; one period of fees is split evenly.

accounts = ["alice", "bob", "charlie"]

[chain]
genesis_time = 1699488000

[tokens]
base = "KLONX"
rewards = ["USDA"]
decimals = 18

[[balance]]
account = "alice"
token = "KLONX"
amount = 1000

[[balance]]
account = "bob"
token = "KLONX"
amount = 1000

[[balance]]
account = "charlie"
token = "KLONX"
amount = 1000

[[step]]
action = "lock"
account = "alice"
amount = 1000
periods = 10

[[step]]
action = "lock"
account = "bob"
amount = 1000
periods = 10

[[step]]
action = "lock"
account = "charlie"
amount = 1000
periods = 10

[[step]]
action = "sleep"
periods = 1

[[step]]
action = "deposit_fees"
token = "USDA"
amount = "30.0"

[[step]]
action = "checkpoint_token"
token = "USDA"

[[step]]
action = "sleep"
periods = 2

[[step]]
action = "checkpoint_token"
token = "USDA"

[[step]]
action = "claim_many"
accounts = ["alice", "bob", "charlie"]
token = "USDA"
"#;
