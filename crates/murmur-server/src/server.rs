//! The five server operations.

use std::sync::{Mutex, RwLock};

use tracing::{debug, info, warn};

use murmur_pir::{Pir, PirScheme};
use murmur_types::wire::{
    AddAsyncInvitationRequest, GetAsyncInvitationsRequest, GetAsyncInvitationsResponse,
    ReceiveMessageRequest, ReceiveMessageResponse, RegisterRequest, RegisterResponse,
    SendMessageRequest, SendMessageResponse,
};
use murmur_types::{
    PirValue, ASYNC_INVITATION_CIPHERTEXT_SIZE, MAX_ASYNC_INVITATION_BATCH_SIZE, MESSAGE_SIZE,
    PUBLIC_KEY_SIZE,
};

use crate::{expect_len, AccountManager, AdmissionPolicy, AsyncInvitationStore, Result, ServerError};

pub struct Server {
    messages: RwLock<Box<dyn Pir>>,
    acks: RwLock<Box<dyn Pir>>,
    accounts: Box<dyn AccountManager>,
    invitations: Mutex<AsyncInvitationStore>,
    admission: AdmissionPolicy,
}

fn poisoned<T>(_: T) -> ServerError {
    ServerError::Internal("server lock poisoned".into())
}

impl Server {
    /// Compose a server. Existing accounts size both databases and repopulate
    /// the invitation board's public keys.
    pub fn new(
        scheme: PirScheme,
        accounts: Box<dyn AccountManager>,
        admission: AdmissionPolicy,
    ) -> Result<Self> {
        let mut messages = scheme.new_server()?;
        let mut acks = scheme.new_server()?;
        if let Some(max) = accounts.max_allocation()? {
            messages.allocate_to_max(max)?;
            acks.allocate_to_max(max)?;
        }

        let mut invitations = AsyncInvitationStore::new();
        for (index, key) in accounts.registered_keys()? {
            invitations.register(index, key);
        }
        info!(?scheme, db_rows = messages.db_rows(), "server ready");

        Ok(Self {
            messages: RwLock::new(messages),
            acks: RwLock::new(acks),
            accounts,
            invitations: Mutex::new(invitations),
            admission,
        })
    }

    pub fn register(&self, req: RegisterRequest) -> Result<RegisterResponse> {
        expect_len("invitation public key", req.invitation_public_key.len(), PUBLIC_KEY_SIZE)?;
        if !self.admission.admits(&req.beta_key) {
            warn!("registration with an invalid admission key");
            return Err(ServerError::Unauthenticated("invalid admission key".into()));
        }

        let allocation = {
            let mut messages = self.messages.write().map_err(poisoned)?;
            let mut acks = self.acks.write().map_err(poisoned)?;
            let allocation = messages.allocate()?;
            let ack_allocation = acks.allocate()?;
            if allocation != ack_allocation {
                return Err(ServerError::Internal(format!(
                    "message and ack databases diverged: {allocation} != {ack_allocation}"
                )));
            }
            allocation
        };

        let authentication_token = self
            .accounts
            .generate_account(&req.invitation_public_key, allocation)?;
        self.invitations
            .lock()
            .map_err(poisoned)?
            .register(allocation, req.invitation_public_key);
        info!(allocation, "registered account");
        Ok(RegisterResponse {
            authentication_token,
            allocation,
        })
    }

    pub fn send_message(&self, req: SendMessageRequest) -> Result<SendMessageResponse> {
        expect_len("message", req.message.len(), MESSAGE_SIZE)?;
        expect_len("acks", req.acks.len(), MESSAGE_SIZE)?;
        self.authorize(&req.authentication_token, req.index)?;

        let message = to_value(&req.message)?;
        let acks = to_value(&req.acks)?;
        let db_rows = {
            let mut messages = self.messages.write().map_err(poisoned)?;
            messages.set_value(req.index, &message)?;
            self.acks.write().map_err(poisoned)?.set_value(req.index, &acks)?;
            messages.db_rows()
        };
        debug!(index = req.index, "stored message");
        Ok(SendMessageResponse {
            db_rows: db_rows as u64,
        })
    }

    /// Answer the same query against the message and ack databases.
    pub fn receive_message(&self, req: ReceiveMessageRequest) -> Result<ReceiveMessageResponse> {
        let pir_answer = self
            .messages
            .read()
            .map_err(poisoned)?
            .get_value_privately(&req.pir_query)?;
        let pir_answer_acks = self
            .acks
            .read()
            .map_err(poisoned)?
            .get_value_privately(&req.pir_query)?;
        Ok(ReceiveMessageResponse {
            pir_answer,
            pir_answer_acks,
        })
    }

    pub fn add_async_invitation(&self, req: AddAsyncInvitationRequest) -> Result<()> {
        expect_len("invitation", req.invitation.len(), ASYNC_INVITATION_CIPHERTEXT_SIZE)?;
        self.authorize(&req.authentication_token, req.index)?;
        self.invitations
            .lock()
            .map_err(poisoned)?
            .set_invitation(req.index, req.invitation);
        Ok(())
    }

    pub fn get_async_invitations(
        &self,
        req: GetAsyncInvitationsRequest,
    ) -> Result<GetAsyncInvitationsResponse> {
        let GetAsyncInvitationsRequest {
            start_index,
            end_index,
        } = req;
        if end_index < start_index {
            return Err(ServerError::InvalidArgument(format!(
                "end index {end_index} before start index {start_index}"
            )));
        }
        if end_index - start_index > MAX_ASYNC_INVITATION_BATCH_SIZE {
            return Err(ServerError::InvalidArgument(format!(
                "at most {MAX_ASYNC_INVITATION_BATCH_SIZE} invitations per request"
            )));
        }
        let (invitations, invitation_public_keys) = self
            .invitations
            .lock()
            .map_err(poisoned)?
            .range(start_index, end_index);
        Ok(GetAsyncInvitationsResponse {
            invitations,
            invitation_public_keys,
        })
    }

    pub fn db_rows(&self) -> Result<usize> {
        Ok(self.messages.read().map_err(poisoned)?.db_rows())
    }

    fn authorize(&self, token: &str, index: murmur_types::PirIndex) -> Result<()> {
        if self.accounts.valid_index_access(token, index)? {
            Ok(())
        } else {
            warn!(index, "rejected write with a bad token");
            Err(ServerError::PermissionDenied)
        }
    }
}

fn to_value(bytes: &[u8]) -> Result<PirValue> {
    bytes
        .try_into()
        .map_err(|_| ServerError::InvalidArgument("row must be MESSAGE_SIZE bytes".into()))
}
