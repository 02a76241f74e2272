//! # Compose Session
//!
//! Drives a [`PostForm`] from a stream of events on a single task.
//!
//! Uploads run as separate tasks and report back through the same event
//! channel, so input keeps flowing while a file is processed and the result
//! is judged against the form as it is by then. The allocation ack is awaited
//! alongside the event stream and always wins a tie, so an edit queued right
//! behind the ack is already transcribed against the allocated post.

use std::sync::Arc;

use rb_core::{PostId, ServerMessage, UploadDescriptor, UploadFile, UploadService};
use tokio::sync::{mpsc, oneshot};

use crate::form::PostForm;

/// Something that happened to the post form.
#[derive(Debug)]
pub enum ComposeEvent {
    /// The input now reads this
    Input(String),
    /// Link to a post, optionally quoting part of it
    Quote { id: PostId, selection: Option<String> },
    Upload(UploadFile),
    RetryUpload,
    /// Result of an upload or retry task
    UploadFinished(Option<UploadDescriptor>),
    Server(ServerMessage),
    Spoiler,
    Close,
    Expire,
}

pub struct ComposeSession {
    form: PostForm,
    uploads: Arc<dyn UploadService>,
    events: mpsc::Receiver<ComposeEvent>,
    /// Weak so that dropping every external sender ends the session
    loopback: mpsc::WeakSender<ComposeEvent>,
    pending_ack: Option<oneshot::Receiver<PostId>>,
}

async fn wait_ack(
    rx: &mut Option<oneshot::Receiver<PostId>>,
) -> Result<PostId, oneshot::error::RecvError> {
    match rx {
        Some(rx) => rx.await,
        None => std::future::pending().await,
    }
}

impl ComposeSession {
    pub fn new(
        form: PostForm,
        uploads: Arc<dyn UploadService>,
        capacity: usize,
    ) -> (Self, mpsc::Sender<ComposeEvent>) {
        let (tx, events) = mpsc::channel(capacity);
        let session = Self {
            form,
            uploads,
            events,
            loopback: tx.downgrade(),
            pending_ack: None,
        };
        (session, tx)
    }

    /// Runs until the post is halted with no ack outstanding, or every sender
    /// is gone. Returns the form in its final state.
    pub async fn run(mut self) -> PostForm {
        loop {
            if self.form.draft().lifecycle.is_halted() && self.pending_ack.is_none() {
                break;
            }

            tokio::select! {
                biased;

                ack = wait_ack(&mut self.pending_ack) => {
                    self.pending_ack = None;
                    match ack {
                        Ok(id) => self.form.receive_id(id).await,
                        Err(_) => log::warn!("allocation ack for draft {} was dropped", self.form.draft().key),
                    }
                }
                event = self.events.recv() => match event {
                    Some(event) => self.handle(event),
                    None => break,
                },
            }

            if let Some(rx) = self.form.take_pending_ack() {
                self.pending_ack = Some(rx);
            }
        }
        log::debug!("compose session for draft {} finished", self.form.draft().key);
        self.form
    }

    fn handle(&mut self, event: ComposeEvent) {
        match event {
            ComposeEvent::Input(val) => {
                self.form.parse_input(&val);
            }
            ComposeEvent::Quote { id, selection } => {
                self.form.add_reference(id, selection.as_deref());
            }
            ComposeEvent::Upload(file) => {
                if !self.form.accepts_upload() {
                    log::debug!("upload of {} rejected", file.name);
                    return;
                }
                let uploads = Arc::clone(&self.uploads);
                self.spawn_upload(async move { uploads.upload(file).await });
            }
            ComposeEvent::RetryUpload => {
                let uploads = Arc::clone(&self.uploads);
                self.spawn_upload(async move { uploads.retry().await });
            }
            ComposeEvent::UploadFinished(data) => {
                let outcome = self.form.handle_upload_response(data);
                log::debug!("upload result: {outcome:?}");
            }
            ComposeEvent::Server(ServerMessage::PostId(id)) => {
                let key = self.form.draft().key;
                if !self.form.context().acks.resolve(key, id) {
                    log::warn!("unexpected allocation ack {id}");
                }
            }
            ComposeEvent::Server(ServerMessage::PostData(data)) => self.form.on_allocation(data),
            ComposeEvent::Server(ServerMessage::InsertImage(image)) => self.form.insert_image(image),
            ComposeEvent::Spoiler => {
                self.form.commit_spoiler();
            }
            ComposeEvent::Close => self.form.commit_close(),
            ComposeEvent::Expire => self.form.abandon(),
        }
    }

    fn spawn_upload<F>(&self, job: F)
    where
        F: std::future::Future<Output = Option<UploadDescriptor>> + Send + 'static,
    {
        let loopback = self.loopback.clone();
        tokio::spawn(async move {
            let data = job.await;
            match loopback.upgrade() {
                Some(tx) => {
                    if tx.send(ComposeEvent::UploadFinished(data)).await.is_err() {
                        log::debug!("session gone before upload finished");
                    }
                }
                None => log::debug!("session gone before upload finished"),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use rb_core::{
        BoardConfig, ClientMessage, FormView, IdKind, Identity, ImageData, MockUploadService,
        PageState, PostData, PostDraft, PostPhase, PostRegistry, PostStore, Transport,
    };
    use tokio::sync::Notify;
    use tokio::time::{sleep, timeout};

    use super::*;
    use crate::allocation::AllocationAcks;
    use crate::context::ComposeContext;
    use crate::registry::PostCollection;

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<ClientMessage>>,
    }

    impl RecordingTransport {
        fn sent(&self) -> Vec<ClientMessage> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl Transport for RecordingTransport {
        fn send(&self, msg: &ClientMessage) -> anyhow::Result<()> {
            self.sent.lock().unwrap().push(msg.clone());
            Ok(())
        }
    }

    struct NullView;

    impl FormView for NullView {
        fn render_alloc(&self, _draft: &PostDraft) {}
        fn insert_image(&self, _image: &ImageData) {}
        fn clean_up(&self) {}
        fn replace_text(&self, _text: &str) {}
        fn trim_input(&self, _discarded: usize) {}
        fn propagate_links(&self, _draft: &PostDraft) {}
    }

    #[derive(Default)]
    struct MemoryStore {
        mine: Mutex<Vec<(PostId, PostId)>>,
    }

    #[async_trait]
    impl PostStore for MemoryStore {
        async fn store_mine(&self, id: PostId, op: PostId) -> anyhow::Result<()> {
            self.mine.lock().unwrap().push((id, op));
            Ok(())
        }
        async fn store_seen_post(&self, _id: PostId, _op: PostId) -> anyhow::Result<()> {
            Ok(())
        }
        async fn read_ids(&self, _kind: IdKind, _threads: &[PostId]) -> anyhow::Result<Vec<PostId>> {
            Ok(Vec::new())
        }
    }

    /// Upload service that finishes only when told to.
    struct GatedUploads {
        gate: Notify,
    }

    #[async_trait]
    impl UploadService for GatedUploads {
        async fn upload(&self, file: UploadFile) -> Option<UploadDescriptor> {
            self.gate.notified().await;
            Some(UploadDescriptor { token: "tok".into(), name: file.name, spoiler: false })
        }
        async fn retry(&self) -> Option<UploadDescriptor> {
            None
        }
    }

    struct Fixture {
        transport: Arc<RecordingTransport>,
        store: Arc<MemoryStore>,
        registry: Arc<PostCollection>,
        form: PostForm,
    }

    fn fixture() -> Fixture {
        let transport = Arc::new(RecordingTransport::default());
        let store = Arc::new(MemoryStore::default());
        let registry = Arc::new(PostCollection::new());
        let ctx = ComposeContext {
            transport: transport.clone(),
            registry: registry.clone(),
            store: store.clone(),
            view: Arc::new(NullView),
            acks: AllocationAcks::new(),
            board: BoardConfig::default(),
            page: PageState { board: "b".into(), thread: 1 },
            identity: Identity::default(),
        };
        Fixture { transport, store, registry, form: PostForm::new(ctx) }
    }

    fn file() -> UploadFile {
        UploadFile { name: "cat.png".into(), data: vec![1, 2, 3], spoiler: false }
    }

    async fn wait_until<F>(name: &str, mut condition: F)
    where
        F: FnMut() -> bool,
    {
        timeout(Duration::from_secs(2), async move {
            loop {
                if condition() {
                    return;
                }
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {name}"));
    }

    #[tokio::test]
    async fn test_typing_through_allocation() {
        let f = fixture();
        let (session, tx) = ComposeSession::new(f.form, Arc::new(MockUploadService::new()), 16);

        for event in [
            ComposeEvent::Input("h".into()),
            ComposeEvent::Input("hi".into()),
            ComposeEvent::Server(ServerMessage::PostId(42)),
            ComposeEvent::Input("hi".into()),
            ComposeEvent::Input("hi!".into()),
            ComposeEvent::Close,
        ] {
            tx.send(event).await.unwrap();
        }

        let form = timeout(Duration::from_secs(2), session.run()).await.unwrap();
        assert_eq!(form.phase(), PostPhase::Halted);
        assert_eq!(form.draft().id, 42);
        assert_eq!(form.draft().body_text(), "hi!");

        let sent = f.transport.sent();
        assert_eq!(sent.len(), 4);
        assert!(matches!(sent[0], ClientMessage::InsertPost(_)));
        assert_eq!(sent[1], ClientMessage::Append('i' as u32));
        assert_eq!(sent[2], ClientMessage::Append('!' as u32));
        assert_eq!(sent[3], ClientMessage::ClosePost);

        assert_eq!(*f.store.mine.lock().unwrap(), vec![(42, 1)]);
        assert!(f.registry.get(42).is_some());
    }

    #[tokio::test]
    async fn test_late_ack_after_close_still_registers() {
        let f = fixture();
        let (session, tx) = ComposeSession::new(f.form, Arc::new(MockUploadService::new()), 16);
        let handle = tokio::spawn(session.run());

        tx.send(ComposeEvent::Input("a".into())).await.unwrap();
        tx.send(ComposeEvent::Close).await.unwrap();
        wait_until("close sent", || f.transport.sent().len() == 2).await;
        // Halted but the ack is still outstanding, so the session keeps going
        assert!(!handle.is_finished());

        tx.send(ComposeEvent::Server(ServerMessage::PostId(5))).await.unwrap();
        let form = timeout(Duration::from_secs(2), handle).await.unwrap().unwrap();
        assert_eq!(form.phase(), PostPhase::Halted);
        assert_eq!(form.draft().id, 5);
        assert!(f.registry.get(5).is_some());
        assert_eq!(*f.store.mine.lock().unwrap(), vec![(5, 1)]);
        assert_eq!(f.transport.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_upload_result_judged_at_arrival() {
        let f = fixture();
        let uploads = Arc::new(GatedUploads { gate: Notify::new() });
        let (session, tx) = ComposeSession::new(f.form, uploads.clone(), 16);
        let handle = tokio::spawn(session.run());

        // Upload starts on an empty draft, text arrives while it processes
        tx.send(ComposeEvent::Upload(file())).await.unwrap();
        tx.send(ComposeEvent::Input("caption".into())).await.unwrap();
        wait_until("text allocation", || f.transport.sent().len() == 1).await;

        tx.send(ComposeEvent::Server(ServerMessage::PostId(9))).await.unwrap();
        tx.send(ComposeEvent::Input("caption!".into())).await.unwrap();
        wait_until("append", || f.transport.sent().len() == 2).await;

        // Now allocated, so the image goes out as insertImage
        uploads.gate.notify_one();
        wait_until("image insert", || f.transport.sent().len() == 3).await;
        assert_eq!(
            f.transport.sent()[2],
            ClientMessage::InsertImage(UploadDescriptor {
                token: "tok".into(),
                name: "cat.png".into(),
                spoiler: false,
            })
        );

        tx.send(ComposeEvent::Server(ServerMessage::PostData(PostData {
            id: 9,
            op: 1,
            ..PostData::default()
        })))
        .await
        .unwrap();
        tx.send(ComposeEvent::Expire).await.unwrap();
        let form = timeout(Duration::from_secs(2), handle).await.unwrap().unwrap();
        assert!(form.draft().has_image());
        assert_eq!(f.transport.sent().len(), 3);
    }

    #[tokio::test]
    async fn test_upload_first_allocates_with_image() {
        let f = fixture();
        let mut uploads = MockUploadService::new();
        uploads.expect_upload().times(1).returning(|file| {
            Some(UploadDescriptor { token: "t1".into(), name: file.name, spoiler: false })
        });
        let (session, tx) = ComposeSession::new(f.form, Arc::new(uploads), 16);
        let handle = tokio::spawn(session.run());

        tx.send(ComposeEvent::Upload(file())).await.unwrap();
        wait_until("allocation", || f.transport.sent().len() == 1).await;
        match &f.transport.sent()[0] {
            ClientMessage::InsertPost(req) => {
                assert!(req.body.is_none());
                assert_eq!(req.image.as_ref().map(|i| i.token.as_str()), Some("t1"));
            }
            other => panic!("unexpected {other:?}"),
        }

        // Second upload is refused up front: the slot is taken
        tx.send(ComposeEvent::Upload(file())).await.unwrap();
        tx.send(ComposeEvent::Server(ServerMessage::PostId(3))).await.unwrap();
        tx.send(ComposeEvent::Close).await.unwrap();
        let form = timeout(Duration::from_secs(2), handle).await.unwrap().unwrap();
        assert_eq!(form.draft().id, 3);
        assert_eq!(f.transport.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_upload_then_retry() {
        let f = fixture();
        let mut uploads = MockUploadService::new();
        uploads.expect_upload().times(1).returning(|_| None);
        uploads.expect_retry().times(1).returning(|| {
            Some(UploadDescriptor { token: "again".into(), name: "cat.png".into(), spoiler: true })
        });
        let (session, tx) = ComposeSession::new(f.form, Arc::new(uploads), 16);
        let handle = tokio::spawn(session.run());

        tx.send(ComposeEvent::Upload(file())).await.unwrap();
        sleep(Duration::from_millis(20)).await;
        assert!(f.transport.sent().is_empty());

        tx.send(ComposeEvent::RetryUpload).await.unwrap();
        wait_until("allocation", || f.transport.sent().len() == 1).await;

        drop(tx);
        let form = timeout(Duration::from_secs(2), handle).await.unwrap().unwrap();
        assert_eq!(form.phase(), PostPhase::Allocating);
    }
}
