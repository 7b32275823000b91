#![allow(dead_code)]

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::fs;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use tempfile::TempDir;

pub fn create_temp_directory() -> TempDir {
    TempDir::new().unwrap()
}

/// Writes a real, decodable image of the given size.
pub fn write_image(path: &Path, width: u32, height: u32, format: ImageFormat) -> PathBuf {
    let img = DynamicImage::ImageRgb8(image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    }));
    let img = match format {
        ImageFormat::Gif => DynamicImage::ImageRgba8(img.to_rgba8()),
        _ => img,
    };
    img.save_with_format(path, format).unwrap();
    path.to_path_buf()
}

/// Half-transparent red PNG.
pub fn write_transparent_png(path: &Path, width: u32, height: u32) -> PathBuf {
    let img = RgbaImage::from_pixel(width, height, Rgba([255, 0, 0, 128]));
    DynamicImage::ImageRgba8(img)
        .save_with_format(path, ImageFormat::Png)
        .unwrap();
    path.to_path_buf()
}

/// Three real images, one corrupt file with an image extension, and two
/// files that aren't images at all.
pub fn create_mixed_input(dir: &Path) -> Vec<PathBuf> {
    let images = vec![
        write_image(&dir.join("wide.png"), 300, 200, ImageFormat::Png),
        write_image(&dir.join("tall.jpg"), 120, 240, ImageFormat::Jpeg),
        write_image(&dir.join("small.gif"), 40, 30, ImageFormat::Gif),
    ];
    fs::write(dir.join("notes.txt"), "not an image").unwrap();
    fs::write(dir.join("data.json"), "{}").unwrap();
    images
}

pub fn create_nested_directory_structure(dir: &Path) -> PathBuf {
    let subdir = dir.join("subdir");
    fs::create_dir(&subdir).unwrap();
    write_image(&subdir.join("nested.webp"), 64, 32, ImageFormat::WebP);
    fs::write(subdir.join("nested.txt"), "nested text").unwrap();
    subdir
}

/// One HTTP request as the stub server saw it.
#[derive(Debug)]
pub struct CapturedRequest {
    pub head: String,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<String> {
        let name = name.to_ascii_lowercase();
        self.head.lines().skip(1).find_map(|line| {
            let (key, value) = line.split_once(':')?;
            (key.trim().to_ascii_lowercase() == name).then(|| value.trim().to_string())
        })
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

/// Minimal HTTP/1.1 server answering each connection with the next canned
/// `(status, body)` pair, then stopping.
pub struct StubServer {
    pub url: String,
    handle: JoinHandle<Vec<CapturedRequest>>,
}

impl StubServer {
    pub fn start(responses: Vec<(u16, String)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/image-embed", listener.local_addr().unwrap());

        let handle = thread::spawn(move || {
            let mut captured = Vec::new();
            for (status, body) in responses {
                let (mut stream, _) = listener.accept().unwrap();
                captured.push(read_request(&mut stream));
                let reply = format!(
                    "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                stream.write_all(reply.as_bytes()).unwrap();
                stream.flush().unwrap();
            }
            captured
        });

        Self { url, handle }
    }

    /// Waits for every canned response to be served.
    pub fn finish(self) -> Vec<CapturedRequest> {
        self.handle.join().unwrap()
    }
}

fn read_request(stream: &mut impl Read) -> CapturedRequest {
    let mut data = Vec::new();
    let mut chunk = [0u8; 8192];

    let header_end = loop {
        let n = stream.read(&mut chunk).unwrap();
        assert!(n > 0, "connection closed before headers were complete");
        data.extend_from_slice(&chunk[..n]);
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&data[..header_end]).into_owned();
    let content_length = head
        .lines()
        .find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim()
                .eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);

    while data.len() < header_end + content_length {
        let n = stream.read(&mut chunk).unwrap();
        if n == 0 {
            break;
        }
        data.extend_from_slice(&chunk[..n]);
    }

    CapturedRequest {
        head,
        body: data[header_end..].to_vec(),
    }
}
