use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use captcha_pipeline::engine::{ClassifyOptions, Classifier, Detector, SlideMatcher};
use captcha_pipeline::processing::codec;
use captcha_pipeline::{BoundingBox, CaptchaPipeline, ImageBytes, RecognitionResult, SlideOutput};
use image::{DynamicImage, GrayImage, ImageBuffer, Luma, Rgb};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

/// Encode a generated image as PNG bytes
pub fn png(img: DynamicImage) -> ImageBytes {
    codec::encode_png(&img).expect("Failed to encode test image")
}

/// Grayscale image whose pixel value is the row index (mod 256)
pub fn row_gradient(width: u32, height: u32) -> ImageBytes {
    let img: GrayImage = ImageBuffer::from_fn(width, height, |_, y| Luma([(y % 256) as u8]));
    png(DynamicImage::ImageLuma8(img))
}

/// Left half pure red, right half pure blue
pub fn red_blue(width: u32, height: u32) -> ImageBytes {
    let img = ImageBuffer::from_fn(width, height, |x, _| {
        if x < width / 2 {
            Rgb([255u8, 0u8, 0u8])
        } else {
            Rgb([0u8, 0u8, 255u8])
        }
    });
    png(DynamicImage::ImageRgb8(img))
}

/// Pseudo-random RGB noise; compresses poorly, so the PNG stays large
pub fn noise(width: u32, height: u32) -> ImageBytes {
    let mut state = 0x2545_f491_u32;
    let img = ImageBuffer::from_fn(width, height, |_, _| {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        let [r, g, b, _] = state.to_le_bytes();
        Rgb([r, g, b])
    });
    png(DynamicImage::ImageRgb8(img))
}

pub fn data_uri(bytes: &ImageBytes) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(bytes.as_slice()))
}

pub fn base64(bytes: &ImageBytes) -> String {
    STANDARD.encode(bytes.as_slice())
}

pub fn decode_base64_image(text: &str) -> DynamicImage {
    let bytes = STANDARD.decode(text).expect("Output is not base64");
    image::load_from_memory(&bytes).expect("Output is not an image")
}

pub fn decode(bytes: &ImageBytes) -> DynamicImage {
    image::load_from_memory(bytes.as_slice()).expect("Failed to decode test output")
}

/// Serve `image` at `/captcha.png` on a background thread; every other path is 404.
pub fn serve_image(image: &ImageBytes) -> SocketAddr {
    let bytes = image.as_slice().to_vec();
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("Failed to bind test server");
    let addr = listener.local_addr().expect("Test server has no address");
    listener.set_nonblocking(true).expect("Failed to configure test server");

    std::thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("Failed to build test server runtime");
        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::from_std(listener).expect("Failed to adopt listener");
            let app = axum::Router::new().route(
                "/captcha.png",
                axum::routing::get(move || {
                    let bytes = bytes.clone();
                    async move { ([(axum::http::header::CONTENT_TYPE, "image/png")], bytes) }
                }),
            );
            axum::serve(listener, app).await.expect("Test server failed");
        });
    });

    addr
}

/// What the stub classifier answers with
pub enum Reply {
    Fixed(String),
    /// Describe the received image as "WIDTHxHEIGHT"
    CropSize,
    Fail,
}

#[derive(Debug, Clone)]
pub struct ClassifyCall {
    pub image: ImageBytes,
    pub options: ClassifyOptions,
}

/// Classifier double that records every call
pub struct StubClassifier {
    reply: Reply,
    calls: Mutex<Vec<ClassifyCall>>,
}

impl StubClassifier {
    pub fn new(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn fixed(text: &str) -> Arc<Self> {
        Self::new(Reply::Fixed(text.to_string()))
    }

    pub fn calls(&self) -> Vec<ClassifyCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl Classifier for StubClassifier {
    fn classify(&self, image: &ImageBytes, options: &ClassifyOptions) -> anyhow::Result<RecognitionResult> {
        self.calls.lock().unwrap().push(ClassifyCall {
            image: image.clone(),
            options: options.clone(),
        });

        match &self.reply {
            Reply::Fixed(text) => Ok(RecognitionResult::Text(text.clone())),
            Reply::CropSize => {
                let img = image::load_from_memory(image.as_slice())?;
                Ok(RecognitionResult::Text(format!("{}x{}", img.width(), img.height())))
            }
            Reply::Fail => anyhow::bail!("classifier exploded"),
        }
    }
}

/// Detector double returning a fixed answer
pub struct StubDetector {
    boxes: Option<Vec<BoundingBox>>,
    calls: Mutex<usize>,
}

impl StubDetector {
    pub fn new(boxes: Option<Vec<BoundingBox>>) -> Arc<Self> {
        Arc::new(Self {
            boxes,
            calls: Mutex::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl Detector for StubDetector {
    fn detect(&self, _image: &ImageBytes) -> anyhow::Result<Option<Vec<BoundingBox>>> {
        *self.calls.lock().unwrap() += 1;
        Ok(self.boxes.clone())
    }
}

/// Slide matcher double returning a fixed answer for both operations
pub struct StubSlideMatcher {
    output: SlideOutput,
}

impl StubSlideMatcher {
    pub fn new(output: SlideOutput) -> Arc<Self> {
        Arc::new(Self { output })
    }
}

impl SlideMatcher for StubSlideMatcher {
    fn slide_match(&self, _: &ImageBytes, _: &ImageBytes, _: bool) -> anyhow::Result<SlideOutput> {
        Ok(self.output.clone())
    }

    fn slide_comparison(&self, _: &ImageBytes, _: &ImageBytes) -> anyhow::Result<SlideOutput> {
        Ok(self.output.clone())
    }
}

/// Pipeline wired to the given doubles
pub fn pipeline_with(
    classifier: Arc<StubClassifier>,
    detector: Arc<StubDetector>,
    slide: Arc<StubSlideMatcher>,
) -> CaptchaPipeline {
    CaptchaPipeline::new(classifier, detector, slide)
}

/// Pipeline with a fixed classifier answer and no detections
pub fn simple_pipeline(classifier: Arc<StubClassifier>) -> CaptchaPipeline {
    pipeline_with(
        classifier,
        StubDetector::new(Some(vec![])),
        StubSlideMatcher::new(SlideOutput::Nothing),
    )
}
