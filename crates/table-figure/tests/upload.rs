use std::sync::Arc;

use async_trait::async_trait;
use manos_plate_core::{EditorRuntime, ImageLike};
use manos_table_figure::{
    FigureError, ImageProbe, ImageProps, ImageResolver, ImageSize, ImageUploadSession,
    ImageUrlSession, ProbeError, ProbeRequest, UploadState,
};
use pretty_assertions::assert_eq;

struct Host {
    uploads: bool,
    fail_with: Option<&'static str>,
}

#[async_trait]
impl EditorRuntime for Host {
    fn can_upload_image(&self) -> bool {
        self.uploads
    }

    async fn upload_image(&self, bytes: Vec<u8>) -> anyhow::Result<ImageLike> {
        if let Some(reason) = self.fail_with {
            anyhow::bail!(reason);
        }
        Ok(ImageLike {
            id: format!("img-{}", bytes.len()),
            src: "https://cdn.test/stored.png".into(),
            width: 64,
            height: 48,
        })
    }

    fn can_proxy_image_src(&self, src: &str) -> bool {
        src.starts_with("http://")
    }

    async fn get_proxy_image_src(&self, src: &str) -> anyhow::Result<String> {
        Ok(format!("https://proxy.test/?u={src}"))
    }
}

struct FixedProbe;

#[async_trait]
impl ImageProbe for FixedProbe {
    async fn load(&self, request: ProbeRequest) -> Result<ImageSize, ProbeError> {
        if request.src.contains("broken") {
            return Err(ProbeError::Load(request.src));
        }
        Ok(ImageSize {
            width: 320,
            height: 200,
        })
    }
}

fn resolver() -> ImageResolver {
    ImageResolver::builder(Arc::new(FixedProbe)).spawn().unwrap()
}

#[tokio::test]
async fn upload_returns_what_the_host_stored() {
    let session = ImageUploadSession::new(Some(Arc::new(Host {
        uploads: true,
        fail_with: None,
    })));

    let props = session.upload(vec![0; 3]).await.unwrap();
    assert_eq!(
        props,
        ImageProps {
            id: "img-3".into(),
            src: "https://cdn.test/stored.png".into(),
            width: 64,
            height: 48,
        }
    );
    assert!(matches!(session.state(), UploadState::Done(image) if image.id == "img-3"));
}

#[tokio::test]
async fn upload_failures_are_reported_and_recorded() {
    let session = ImageUploadSession::new(Some(Arc::new(Host {
        uploads: true,
        fail_with: Some("quota exceeded"),
    })));

    let err = session.upload(vec![1, 2]).await.unwrap_err();
    assert!(matches!(err, FigureError::Upload(_)));
    assert_eq!(session.state(), UploadState::Failed("quota exceeded".into()));
}

#[tokio::test]
async fn upload_needs_a_capable_runtime() {
    let missing = ImageUploadSession::new(None);
    assert!(matches!(
        missing.upload(Vec::new()).await,
        Err(FigureError::UploadUnavailable)
    ));

    let incapable = ImageUploadSession::new(Some(Arc::new(Host {
        uploads: false,
        fail_with: None,
    })));
    assert!(matches!(
        incapable.upload(Vec::new()).await,
        Err(FigureError::UploadUnavailable)
    ));
    assert_eq!(incapable.state(), UploadState::Idle);
}

#[tokio::test]
async fn url_entry_proxies_then_previews() {
    let runtime: Arc<dyn EditorRuntime> = Arc::new(Host {
        uploads: false,
        fail_with: None,
    });
    let mut session = ImageUrlSession::new(Some(runtime), resolver());

    let preview = session.set_src("  http://example.com/a.png ").await.unwrap();
    assert!(preview.complete);
    assert_eq!(session.src(), "https://proxy.test/?u=http://example.com/a.png");

    let props = session.confirm().unwrap();
    assert_eq!(props.src, "https://proxy.test/?u=http://example.com/a.png");
    assert_eq!((props.width, props.height), (320, 200));
}

#[tokio::test]
async fn unloadable_urls_confirm_without_a_size() {
    let mut session = ImageUrlSession::new(None, resolver());
    assert_eq!(session.confirm(), None);

    let preview = session.set_src("https://example.com/broken.png").await.unwrap();
    assert!(!preview.complete);

    let props = session.confirm().unwrap();
    assert_eq!(props.src, "https://example.com/broken.png");
    assert_eq!((props.width, props.height), (0, 0));
}
