//! # Client — Wallet Orchestration
//!
//! A [`Client`] owns one keypair, its plaintext [`AccountState`], a friends
//! directory and a private [`BaseTable`]. It turns user intents (deposit,
//! transfer, withdraw) into statements, witnesses and proofs, decides when
//! to submit them, and folds observed ledger events back into its state.
//!
//! Spends take `&mut self`, so one client never has two spends in flight.
//! Deferrals sleep until the next epoch boundary inside an explicit loop,
//! bounded by [`ClientConfig::max_deferrals`].

pub mod friends;

use std::collections::HashSet;
use std::sync::Arc;

use ark_bn254::Fr;
use ark_std::rand::{rngs::StdRng, Rng};
use thiserror::Error;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, info, warn};

use crate::account::{
    check_capacity, estimate_proving_millis, plan_spend, AccountError, AccountState,
    AnonymitySet, Clock, EpochSchedule, Schedule,
};
use crate::config::{ClientConfig, BURN_LATENCY_MILLIS, MAX_BALANCE, MAX_KEY_DELTA};
use crate::crypto::curve::{epoch_generator, generator, point_to_bytes, random_scalar, Point, Scalar};
use crate::crypto::encryption::{decrypt, DecryptError, ElGamal};
use crate::crypto::keys::{Address, Keypair};
use crate::ledger::{
    BurnTransaction, KeyUpdate, Ledger, LedgerError, LedgerParameters, Receipt, TransferEvent,
    TransferTransaction, TxId,
};
use crate::zkp::{
    BaseTable, BurnProof, BurnStatement, BurnWitness, ProofError, TransferProof,
    TransferStatement, TransferWitness,
};

pub use friends::Friends;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("client account is not yet registered")]
    NotRegistered,

    #[error("client account is already registered")]
    AlreadyRegistered,

    #[error("name {name:?} hasn't been friended yet")]
    UnknownFriend { name: String },

    #[error("decoy {name:?} is unknown in the friends directory")]
    UnknownDecoy { name: String },

    #[error("beneficiary {name:?} is not known")]
    UnknownBeneficiary { name: String },

    #[error("sending to yourself is not supported")]
    SelfTransfer,

    #[error("{name:?} appears more than once in the anonymity set")]
    DuplicateParty { name: String },

    #[error("every party (including decoys) must be registered")]
    PartyNotRegistered,

    #[error("gave up after {deferrals} epoch deferrals")]
    TooManyDeferrals { deferrals: u32 },

    #[error(transparent)]
    Account(#[from] AccountError),

    #[error("decryption failed: {0}")]
    Decrypt(#[from] DecryptError),

    #[error("proof construction failed: {0}")]
    Proof(#[from] ProofError),

    #[error("ledger: {0}")]
    Ledger(#[from] LedgerError),
}

/// Key rotation chosen for one transfer.
struct Rotation {
    delta: u64,
    update: KeyUpdate,
}

/// A wallet bound to one ledger.
pub struct Client<L: Ledger> {
    ledger: Arc<L>,
    clock: Arc<dyn Clock>,
    config: ClientConfig,
    parameters: LedgerParameters,
    schedule: EpochSchedule,
    rng: StdRng,
    bases: BaseTable,
    keypair: Option<Keypair>,
    state: AccountState,
    friends: Friends,
    events: broadcast::Receiver<TransferEvent>,
    own_transfers: HashSet<TxId>,
    /// Address that submits withdrawals.
    home: Address,
}

impl<L: Ledger> Client<L> {
    /// Fetch the ledger parameters and start listening for transfers.
    pub fn connect(
        ledger: Arc<L>,
        clock: Arc<dyn Clock>,
        config: ClientConfig,
        mut rng: StdRng,
    ) -> Self {
        let parameters = ledger.parameters();
        let events = ledger.subscribe();
        let home = Address::random(&mut rng);
        Self {
            ledger,
            clock,
            config,
            parameters,
            schedule: EpochSchedule::new(parameters.epoch_length),
            rng,
            bases: BaseTable::new(),
            keypair: None,
            state: AccountState::default(),
            friends: Friends::new(),
            events,
            own_transfers: HashSet::new(),
            home,
        }
    }

    pub fn public_key(&self) -> Option<Point> {
        self.keypair.as_ref().map(Keypair::public)
    }

    /// Secret key, for backing the account up.
    pub fn secret_key(&self) -> Option<Scalar> {
        self.keypair.as_ref().map(Keypair::secret)
    }

    pub fn parameters(&self) -> LedgerParameters {
        self.parameters
    }

    pub fn friends(&self) -> &Friends {
        &self.friends
    }

    pub fn friends_mut(&mut self) -> &mut Friends {
        &mut self.friends
    }

    pub fn epoch(&self) -> u64 {
        self.schedule.epoch_at(self.clock.now_millis())
    }

    /// Account state rolled over to the current epoch.
    pub fn account(&self) -> AccountState {
        self.state.simulate(self.epoch())
    }

    /// Available plus pending.
    pub fn balance(&self) -> u64 {
        self.account().balance()
    }

    fn keypair(&self) -> Result<&Keypair, ClientError> {
        self.keypair.as_ref().ok_or(ClientError::NotRegistered)
    }

    /// Create a fresh keypair and register it.
    pub async fn register(&mut self) -> Result<Receipt, ClientError> {
        if self.keypair.is_some() {
            return Err(ClientError::AlreadyRegistered);
        }
        let keypair = Keypair::generate(&mut self.rng);
        let signature = keypair.sign_registration(&self.ledger.address(), &mut self.rng);
        let receipt = self.ledger.register(keypair.public(), signature).await?;
        self.keypair = Some(keypair);
        self.state = AccountState::new(receipt.epoch);
        info!(epoch = receipt.epoch, "registration successful");
        Ok(receipt)
    }

    /// Recover an account registered earlier. Does not register.
    pub async fn restore(&mut self, secret: Scalar) -> Result<(), ClientError> {
        if self.keypair.is_some() {
            return Err(ClientError::AlreadyRegistered);
        }
        let keypair = Keypair::from_secret(secret);
        let epoch = self.epoch();
        let key = [keypair.public()];
        let now = self.ledger.simulate_accounts(&key, epoch).await;
        let next = self.ledger.simulate_accounts(&key, epoch + 1).await;
        if now[0].is_zero() {
            return Err(ClientError::NotRegistered);
        }
        let available = decrypt(&now[0], &secret, MAX_BALANCE + 1)?;
        let total = decrypt(&next[0], &secret, MAX_BALANCE + 1)?;
        self.state = AccountState {
            available,
            pending: total.saturating_sub(available),
            nonce_used: false,
            last_roll_over: epoch,
        };
        self.keypair = Some(keypair);
        info!(available, pending = self.state.pending, "account recovered");
        Ok(())
    }

    pub async fn deposit(&mut self, value: u64) -> Result<Receipt, ClientError> {
        let key = self.keypair()?.public();
        let receipt = self.ledger.fund(key, value).await?;
        self.state.roll_over(receipt.epoch);
        self.state.pending += value;
        info!(value, balance = self.state.balance(), "deposit successful");
        Ok(receipt)
    }

    /// Send `value` to the friend `name`, hiding among `decoys`. The fee
    /// goes to `beneficiary` when one is named.
    pub async fn transfer(
        &mut self,
        name: &str,
        value: u64,
        decoys: &[&str],
        beneficiary: Option<&str>,
    ) -> Result<Receipt, ClientError> {
        let own = self.keypair()?.public();
        let receiver = self.friends.get(name).ok_or_else(|| ClientError::UnknownFriend {
            name: name.to_string(),
        })?;
        if receiver == own {
            return Err(ClientError::SelfTransfer);
        }
        let mut seen = HashSet::from([point_to_bytes(&own), point_to_bytes(&receiver)]);
        let mut decoy_keys = Vec::with_capacity(decoys.len());
        for decoy in decoys {
            let key = self.friends.get(decoy).ok_or_else(|| ClientError::UnknownDecoy {
                name: decoy.to_string(),
            })?;
            if !seen.insert(point_to_bytes(&key)) {
                return Err(ClientError::DuplicateParty {
                    name: decoy.to_string(),
                });
            }
            decoy_keys.push(key);
        }
        let beneficiary = match beneficiary {
            Some(name) => Some(self.friends.get(name).ok_or_else(|| {
                ClientError::UnknownBeneficiary {
                    name: name.to_string(),
                }
            })?),
            None => None,
        };
        let size = decoy_keys.len() + 2;
        AnonymitySet::validate_size(size)?;
        check_capacity(size, self.parameters.epoch_length)?;

        let fee = self.parameters.fee;
        let epoch = self
            .wait_for_spend(value + fee, estimate_proving_millis(size, false), "transfer")
            .await?;
        let state = self.state;

        let set = AnonymitySet::shuffle(own, receiver, &decoy_keys, &mut self.rng)?;
        let keys = set.keys().to_vec();
        let accounts = self.ledger.simulate_accounts(&keys, epoch).await;
        if accounts.iter().any(ElGamal::is_zero) {
            return Err(ClientError::PartyNotRegistered);
        }

        let secret = self.keypair()?.secret();
        let r = random_scalar(&mut self.rng);
        let d = generator() * r;
        let deltas: Vec<Point> = keys
            .iter()
            .enumerate()
            .map(|(i, key)| {
                let moved = if i == set.sender_index() {
                    -Fr::from(value + fee)
                } else if i == set.receiver_index() {
                    Fr::from(value)
                } else {
                    Fr::from(0u64)
                };
                ElGamal::encrypt_with(key, moved, r).left
            })
            .collect();
        let statement = TransferStatement {
            balances: accounts
                .iter()
                .zip(&deltas)
                .map(|(acc, c)| *acc + ElGamal::new(*c, d))
                .collect(),
            deltas: deltas.clone(),
            d,
            keys: keys.clone(),
            epoch,
            nonce: epoch_generator(epoch) * secret,
            fee,
        };
        let witness = TransferWitness {
            secret,
            randomness: r,
            amount: value,
            remaining: state.available - value - fee,
            sender_index: set.sender_index(),
            receiver_index: set.receiver_index(),
        };
        let proof = TransferProof::prove(&mut self.bases, &statement, &witness, &mut self.rng)?;

        let rotation = if self.config.rotate_keys {
            Some(self.rotation(&keys, &accounts, d, epoch).await)
        } else {
            None
        };

        let receipt = self
            .ledger
            .transfer(TransferTransaction {
                deltas,
                d,
                keys: keys.clone(),
                nonce: statement.nonce,
                beneficiary,
                proof: proof.to_bytes(),
                key_update: rotation.as_ref().map(|r| r.update.clone()),
            })
            .await?;

        self.state.available -= value + fee;
        self.state.nonce_used = true;
        self.own_transfers.insert(receipt.tx_id);
        if let Some(rotation) = rotation {
            if let Some(keypair) = self.keypair.as_mut() {
                keypair.rotate(rotation.delta);
            }
            self.friends.rotate(&keys, rotation.delta);
            debug!(delta = rotation.delta, "keys rotated");
        }
        info!(
            tx_id = %receipt.tx_id,
            value,
            fee,
            size,
            balance = self.state.balance(),
            "transfer successful"
        );
        Ok(receipt)
    }

    /// Pick `δ` and build the re-keying data for every party.
    async fn rotation(
        &mut self,
        keys: &[Point],
        accounts: &[ElGamal],
        d: Point,
        epoch: u64,
    ) -> Rotation {
        let delta = self.rng.gen_range(1..=MAX_KEY_DELTA);
        let scale = Fr::from(delta);
        let shift = generator() * scale;
        let r = random_scalar(&mut self.rng);
        let pending = self.ledger.pending_accounts(keys, epoch).await;
        let update = KeyUpdate {
            up_left: keys.iter().map(|key| shift + *key * r).collect(),
            up_right: generator() * r,
            account_adjust: accounts.iter().map(|acc| acc.right * scale).collect(),
            pending_adjust: pending.iter().map(|p| (p.right + d) * scale).collect(),
            new_keys: keys.iter().map(|key| *key + shift).collect(),
        };
        Rotation { delta, update }
    }

    /// Withdraw `value` to the client's home address.
    pub async fn withdraw(&mut self, value: u64) -> Result<Receipt, ClientError> {
        let key = self.keypair()?.public();
        let epoch = self
            .wait_for_spend(value, BURN_LATENCY_MILLIS, "withdrawal")
            .await?;
        let state = self.state;
        let secret = self.keypair()?.secret();

        let accounts = self.ledger.simulate_accounts(&[key], epoch).await;
        let Some(account) = accounts.first().filter(|acc| !acc.is_zero()) else {
            return Err(ClientError::NotRegistered);
        };
        let statement = BurnStatement {
            balance: account.plus(-Fr::from(value)),
            key,
            epoch,
            nonce: epoch_generator(epoch) * secret,
            sender: self.home,
        };
        let witness = BurnWitness {
            secret,
            remaining: state.available - value,
        };
        let proof = BurnProof::prove(&statement, &witness, &mut self.rng);
        let receipt = self
            .ledger
            .burn(BurnTransaction {
                key,
                value,
                nonce: statement.nonce,
                sender: self.home,
                proof: proof.to_bytes(),
            })
            .await?;

        self.state.available -= value;
        self.state.nonce_used = true;
        info!(tx_id = %receipt.tx_id, value, balance = self.state.balance(), "withdrawal successful");
        Ok(receipt)
    }

    /// Sleep through epoch boundaries until spending `total` is possible.
    /// Leaves `self.state` rolled over and returns the epoch to spend in.
    async fn wait_for_spend(
        &mut self,
        total: u64,
        required_millis: u64,
        operation: &'static str,
    ) -> Result<u64, ClientError> {
        let mut deferrals = 0;
        loop {
            let now = self.clock.now_millis();
            let epoch = self.schedule.epoch_at(now);
            self.state.roll_over(epoch);
            let left = self.schedule.millis_until_next(now);
            match plan_spend(&self.state, total, required_millis, left)? {
                Schedule::Now => return Ok(epoch),
                Schedule::Defer(reason) => {
                    if deferrals >= self.config.max_deferrals {
                        return Err(ClientError::TooManyDeferrals { deferrals });
                    }
                    deferrals += 1;
                    info!(
                        operation,
                        %reason,
                        wait_ms = left,
                        "queued until the next epoch"
                    );
                    tokio::time::sleep(self.schedule.until_next(now)).await;
                }
            }
        }
    }

    /// Apply every transfer announced since the last call. Returns how
    /// many events were read.
    pub fn sync(&mut self) -> usize {
        let mut read = 0;
        loop {
            match self.events.try_recv() {
                Ok(event) => {
                    read += 1;
                    if let Err(e) = self.observe_transfer(&event) {
                        warn!(tx_id = %event.tx_id, error = %e, "could not apply transfer");
                    }
                }
                Err(TryRecvError::Lagged(missed)) => {
                    warn!(missed, "transfer events dropped; balance may be stale");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return read,
            }
        }
    }

    /// Fold one transfer into the local state.
    pub fn observe_transfer(&mut self, event: &TransferEvent) -> Result<(), ClientError> {
        if self.own_transfers.contains(&event.tx_id) {
            return Ok(());
        }
        let Some(keypair) = self.keypair.as_ref() else {
            return Ok(());
        };
        let own = keypair.public();
        let secret = keypair.secret();

        if event.beneficiary == Some(own) {
            self.state.roll_over(event.epoch);
            self.state.pending += self.parameters.fee;
        }
        let Some(i) = event.parties.iter().position(|party| *party == own) else {
            return Ok(());
        };
        self.state.roll_over(event.epoch);
        if let Some(delta) = event.delta(i) {
            let received = decrypt(&delta, &secret, MAX_BALANCE + 1)?;
            self.state.pending += received;
            if received > 0 {
                info!(tx_id = %event.tx_id, received, "transfer received");
            }
        }
        if let Some(rotation) = &event.key_update {
            if let Some(up_left) = rotation.up_left.get(i) {
                let update = ElGamal::new(*up_left, rotation.up_right);
                let delta = decrypt(&update, &secret, MAX_KEY_DELTA + 1)?;
                if delta > 0 {
                    if let Some(keypair) = self.keypair.as_mut() {
                        keypair.rotate(delta);
                    }
                    self.friends.rotate(&event.parties, delta);
                    debug!(delta, "key rotated by incoming transfer");
                }
            }
        }
        Ok(())
    }
}
