// ==========================================
// 统计数据抽取 - 压缩包文本读取器
// ==========================================
// 输入: <stem>.zip，内含同名 <stem>.csv
// 输出: 字符串矩阵（行 × 列），不做表头解释
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use csv::ReaderBuilder;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

const UTF8_BOM: char = '\u{feff}';

pub struct ArchiveReader;

impl ArchiveReader {
    /// 读取压缩包中与压缩包同名的 CSV 文件
    pub fn read_matrix<P: AsRef<Path>>(&self, zip_path: P) -> ImportResult<Vec<Vec<String>>> {
        let path = zip_path.as_ref();

        // 检查文件存在
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }

        // 检查扩展名
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if !ext.eq_ignore_ascii_case("zip") {
            return Err(ImportError::UnsupportedFormat(ext.to_string()));
        }

        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| ImportError::ArchiveError(format!("无法解析文件名: {}", path.display())))?;
        let entry_name = format!("{}.csv", stem);

        let file = File::open(path)?;
        let mut archive = zip::ZipArchive::new(file)?;
        let entry = archive.by_name(&entry_name)?;
        debug!(entry = %entry_name, size = entry.size(), "读取压缩包条目");

        let matrix = self.parse_csv(entry)?;
        info!(file_path = %path.display(), rows = matrix.len(), "压缩包读取完成");
        Ok(matrix)
    }

    /// 解析分隔文本为矩阵（行长度可不一致）
    pub fn parse_csv<R: Read>(&self, reader: R) -> ImportResult<Vec<Vec<String>>> {
        let mut csv_reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true) // 允许行长度不一致
            .delimiter(b',')
            .quote(b'"')
            .from_reader(reader);

        let mut matrix = Vec::new();
        for result in csv_reader.records() {
            let record = result?;
            matrix.push(record.iter().map(|v| v.to_string()).collect::<Vec<_>>());
        }

        // 去掉首个单元格的 BOM
        if let Some(first) = matrix.first_mut().and_then(|row| row.first_mut()) {
            if first.starts_with(UTF8_BOM) {
                *first = first.trim_start_matches(UTF8_BOM).to_string();
            }
        }

        Ok(matrix)
    }
}
