// 附件存储
// 批量落盘与流式读取, 文件名不信任客户端

use std::path::{Path, PathBuf};

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use tokio::fs;
use tokio_util::io::ReaderStream;
use uuid::Uuid;

use crate::error::AppError;

/// 单个附件的大小上限 (20 MiB)
pub const MAX_FILE_SIZE: usize = 20 * 1024 * 1024;

// RFC 5987 attr-char 之外的字节都转义
const DISPOSITION_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'.')
    .remove(b'-')
    .remove(b'_')
    .remove(b'~');

/// 上传表单里的一个附件
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// 已落盘的附件
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub name: String,
    pub mime_type: String,
    pub path: PathBuf,
}

/// 附件存储根目录
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub async fn ensure_root(&self) -> Result<(), std::io::Error> {
        fs::create_dir_all(&self.root).await
    }

    /// 整批落盘: 任何一个失败就删掉已写出的文件, 不留半截批次
    pub async fn store_batch(
        &self,
        uploads: &[UploadedFile],
    ) -> Result<Vec<StoredFile>, AppError> {
        let mut stored: Vec<StoredFile> = Vec::with_capacity(uploads.len());
        for upload in uploads {
            match self.store_one(upload).await {
                Ok(file) => stored.push(file),
                Err(err) => {
                    self.remove_batch(&stored).await;
                    return Err(err);
                }
            }
        }
        Ok(stored)
    }

    async fn store_one(&self, upload: &UploadedFile) -> Result<StoredFile, AppError> {
        if upload.bytes.len() > MAX_FILE_SIZE {
            return Err(AppError::PayloadTooLarge);
        }
        let name = sanitize_file_name(&upload.name);
        let mime_type = sniff_mime(&upload.bytes);
        let path = self.root.join(format!("{}_{}", Uuid::new_v4(), name));
        fs::write(&path, &upload.bytes).await?;
        Ok(StoredFile {
            name,
            mime_type,
            path,
        })
    }

    /// 清理已落盘的附件, 清理失败只记日志
    pub async fn remove_batch(&self, stored: &[StoredFile]) {
        for file in stored {
            if let Err(err) = fs::remove_file(&file.path).await {
                tracing::warn!("failed to remove {}: {}", file.path.display(), err);
            }
        }
    }
}

/// 只保留文件名部分, 去掉客户端传来的路径
pub fn sanitize_file_name(raw: &str) -> String {
    let name = raw.rsplit(['/', '\\']).next().unwrap_or(raw).trim();
    let mut name = match name {
        "" | "." | ".." => "file",
        other => other,
    }
    .to_string();
    // 文件系统单个名称上限 255 字节, 给 uuid 前缀留出空间
    let mut cut = 200.min(name.len());
    while !name.is_char_boundary(cut) {
        cut -= 1;
    }
    name.truncate(cut);
    name
}

/// 按内容嗅探 MIME 类型, 嗅探不出时回退为二进制流
pub fn sniff_mime(bytes: &[u8]) -> String {
    infer::get(bytes)
        .map(|kind| kind.mime_type().to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

/// 下载响应的 Content-Disposition 值, 文件名按 RFC 5987 编码
pub fn content_disposition(name: &str) -> String {
    let encoded = utf8_percent_encode(name, DISPOSITION_ESCAPE);
    format!("attachment; filename*=UTF-8''{encoded}")
}

/// 打开已存储的附件用于流式下载
pub struct FileStreamer {
    pub name: String,
    pub mime_type: String,
    file: fs::File,
}

impl FileStreamer {
    /// 附件行存在但磁盘文件缺失时视为不存在
    pub async fn open(name: String, mime_type: String, path: &Path) -> Result<Self, AppError> {
        let file = match fs::File::open(path).await {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("attachment missing on disk: {}", path.display());
                return Err(AppError::NotFound("文件"));
            }
            Err(err) => return Err(err.into()),
        };
        Ok(Self {
            name,
            mime_type,
            file,
        })
    }

    pub fn content_disposition(&self) -> String {
        content_disposition(&self.name)
    }

    pub fn into_stream(self) -> ReaderStream<fs::File> {
        ReaderStream::new(self.file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PNG_MAGIC: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];

    fn upload(name: &str, bytes: Vec<u8>) -> UploadedFile {
        UploadedFile {
            name: name.to_string(),
            bytes,
        }
    }

    #[tokio::test]
    async fn store_batch_writes_and_sniffs() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path().to_path_buf());

        let stored = storage
            .store_batch(&[
                upload("картинка.png", PNG_MAGIC.to_vec()),
                upload("note.txt", b"hello".to_vec()),
            ])
            .await
            .unwrap();

        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].mime_type, "image/png");
        assert_eq!(stored[1].mime_type, "application/octet-stream");
        for file in &stored {
            assert!(file.path.exists());
            assert!(file.path.starts_with(dir.path()));
        }
        assert_eq!(stored[0].name, "картинка.png");
    }

    #[tokio::test]
    async fn oversized_file_aborts_whole_batch() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path().to_path_buf());

        let result = storage
            .store_batch(&[
                upload("ok.bin", vec![1, 2, 3]),
                upload("big.bin", vec![0; MAX_FILE_SIZE + 1]),
            ])
            .await;

        assert!(matches!(result, Err(AppError::PayloadTooLarge)));
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert!(entries.is_empty(), "失败的批次不应留下任何文件");
    }

    #[tokio::test]
    async fn remove_batch_deletes_files() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path().to_path_buf());

        let stored = storage
            .store_batch(&[upload("a.bin", vec![1]), upload("b.bin", vec![2])])
            .await
            .unwrap();
        storage.remove_batch(&stored).await;
        for file in &stored {
            assert!(!file.path.exists());
        }
    }

    #[tokio::test]
    async fn streamer_opens_stored_file() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path().to_path_buf());
        let stored = storage
            .store_batch(&[upload("doc.bin", vec![7; 16])])
            .await
            .unwrap();

        let file = &stored[0];
        let streamer = FileStreamer::open(
            file.name.clone(),
            file.mime_type.clone(),
            &file.path,
        )
        .await
        .unwrap();
        assert_eq!(streamer.name, "doc.bin");

        let missing = FileStreamer::open(
            "gone".to_string(),
            "application/octet-stream".to_string(),
            &dir.path().join("nope.bin"),
        )
        .await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }

    #[test]
    fn sanitize_strips_path_components() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\temp\\report.xlsx"), "report.xlsx");
        assert_eq!(sanitize_file_name("plain.txt"), "plain.txt");
        assert_eq!(sanitize_file_name(""), "file");
        assert_eq!(sanitize_file_name(".."), "file");
    }

    #[test]
    fn sanitize_respects_char_boundaries() {
        let long = "ф".repeat(300);
        let cut = sanitize_file_name(&long);
        assert!(cut.len() <= 200);
        assert!(cut.chars().all(|c| c == 'ф'));
    }

    #[test]
    fn disposition_encodes_non_ascii() {
        let value = content_disposition("отчёт 2024.pdf");
        assert!(value.starts_with("attachment; filename*=UTF-8''"));
        assert!(value.contains("%20"));
        assert!(!value.contains('ё'));

        assert_eq!(
            content_disposition("report.pdf"),
            "attachment; filename*=UTF-8''report.pdf"
        );
    }
}
