use crate::component::session::SlideshowSession;
use crate::config::save::{add_recent_path, save_settings};
use crate::config::{Config, MAX_PHOTOS};
use crate::tools::{PhotoRef, scan_photo_files, validate_directory_exists};
use anyhow::{Context, Result};
use console::style;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, MultiSelect, Select, Sort};
use log::{info, warn};
use std::path::{Path, PathBuf};

/// 從資料夾挑選要播放的照片
pub struct PhotoSelector<'a> {
    config: &'a mut Config,
}

impl<'a> PhotoSelector<'a> {
    pub const fn new(config: &'a mut Config) -> Self {
        Self { config }
    }

    pub fn run(&mut self, session: &mut SlideshowSession) -> Result<()> {
        println!("{}", style("=== 選擇照片 ===").cyan().bold());

        let Some(input_path) = self.prompt_input_path()? else {
            return Ok(());
        };
        // 腳本與工作資料夾不在同一處，照片一律記錄絕對路徑
        let directory = std::path::absolute(&input_path)
            .with_context(|| format!("Failed to resolve {input_path}"))?;

        validate_directory_exists(&directory)?;

        add_recent_path(&mut self.config.settings, &input_path);
        if let Err(e) = save_settings(&self.config.settings) {
            warn!("無法儲存路徑歷史: {e}");
        }

        println!("{}", style("掃描圖片中...").dim());
        let candidates = scan_photo_files(&directory, &self.config.media_type_table)?;

        if candidates.is_empty() {
            println!("{}", style("找不到任何圖片").yellow());
            return Ok(());
        }

        let Some(selected) = Self::prompt_selection(&candidates)? else {
            return Ok(());
        };

        if selected.is_empty() {
            println!("{}", style("未選擇任何照片，保留原本的選擇").yellow());
            return Ok(());
        }

        let photos = limit_selection(selected);
        let Some(photos) = Self::prompt_order(photos)? else {
            return Ok(());
        };
        session.replace_photos(photos.iter().map(|path| PhotoRef::from_path(path)).collect());

        println!(
            "{}",
            style(format!("已選擇 {} 張照片", session.photos.len())).green()
        );
        info!("選擇 {} 張照片: {}", session.photos.len(), directory.display());
        Ok(())
    }

    fn prompt_input_path(&self) -> Result<Option<String>> {
        let recent_paths = &self.config.settings.recent_paths;

        if recent_paths.is_empty() {
            let path: String = Input::new()
                .with_prompt("請輸入照片所在的資料夾路徑")
                .interact_text()?;
            return Ok(Some(path.trim().to_string()));
        }

        let mut options: Vec<String> = recent_paths
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let indicator = if Path::new(p).exists() { "✓" } else { "✗" };
                format!("{} [{indicator}] {p}", i + 1)
            })
            .collect();
        options.push("輸入新路徑...".to_string());

        println!("{}", style("(按 ESC 返回主選單)").dim());

        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("請選擇路徑")
            .items(&options)
            .default(0)
            .interact_opt()?;

        match selection {
            None => Ok(None),
            Some(idx) if idx < recent_paths.len() => Ok(Some(recent_paths[idx].clone())),
            Some(_) => {
                let path: String = Input::new()
                    .with_prompt("請輸入照片所在的資料夾路徑")
                    .interact_text()?;
                Ok(Some(path.trim().to_string()))
            }
        }
    }

    /// 預設全選，ESC 取消
    fn prompt_selection(candidates: &[PathBuf]) -> Result<Option<Vec<PathBuf>>> {
        let items: Vec<String> = candidates
            .iter()
            .map(|path| {
                path.file_name()
                    .unwrap_or_default()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect();
        let defaults = vec![true; items.len()];

        println!(
            "{}",
            style(format!("最多可選 {MAX_PHOTOS} 張，空白鍵切換，Enter 確認")).dim()
        );

        let chosen = MultiSelect::with_theme(&ColorfulTheme::default())
            .with_prompt("選擇要播放的照片")
            .items(&items)
            .defaults(&defaults)
            .interact_opt()?;

        Ok(chosen.map(|indices| {
            indices
                .into_iter()
                .map(|index| candidates[index].clone())
                .collect()
        }))
    }

    /// 讓使用者調整播放順序，ESC 取消
    fn prompt_order(photos: Vec<PathBuf>) -> Result<Option<Vec<PathBuf>>> {
        if photos.len() < 2 {
            return Ok(Some(photos));
        }

        let items: Vec<String> = photos
            .iter()
            .map(|path| {
                path.file_name()
                    .unwrap_or_default()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect();

        let order = Sort::with_theme(&ColorfulTheme::default())
            .with_prompt("調整播放順序（空白鍵選取後上下移動，Enter 確認）")
            .items(&items)
            .interact_opt()?;

        Ok(order.map(|order| apply_order(photos, &order)))
    }
}

/// 依使用者排好的索引重新排列；索引不完整時保留原順序
fn apply_order(photos: Vec<PathBuf>, order: &[usize]) -> Vec<PathBuf> {
    let mut seen = vec![false; photos.len()];
    let is_permutation = order.len() == photos.len()
        && order
            .iter()
            .all(|&index| index < seen.len() && !std::mem::replace(&mut seen[index], true));
    if !is_permutation {
        warn!("排序結果不完整，保留原本順序");
        return photos;
    }

    let mut slots: Vec<Option<PathBuf>> = photos.into_iter().map(Some).collect();
    order.iter().filter_map(|&index| slots[index].take()).collect()
}

/// 超過上限時只保留前面的照片
fn limit_selection(mut photos: Vec<PathBuf>) -> Vec<PathBuf> {
    if photos.len() > MAX_PHOTOS {
        warn!("選擇了 {} 張照片，只保留前 {MAX_PHOTOS} 張", photos.len());
        println!(
            "{}",
            style(format!("最多 {MAX_PHOTOS} 張照片，其餘已略過")).yellow()
        );
        photos.truncate(MAX_PHOTOS);
    }
    photos
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_selection_truncates() {
        let photos: Vec<PathBuf> = (0..20).map(|i| PathBuf::from(format!("{i}.jpg"))).collect();
        let limited = limit_selection(photos);
        assert_eq!(limited.len(), MAX_PHOTOS);
        assert_eq!(limited[0], PathBuf::from("0.jpg"));
    }

    #[test]
    fn test_apply_order_follows_user_order() {
        let photos = vec![
            PathBuf::from("/p/1.jpg"),
            PathBuf::from("/p/2.jpg"),
            PathBuf::from("/p/10.jpg"),
        ];
        let ordered = apply_order(photos, &[2, 0, 1]);
        assert_eq!(
            ordered,
            vec![
                PathBuf::from("/p/10.jpg"),
                PathBuf::from("/p/1.jpg"),
                PathBuf::from("/p/2.jpg"),
            ]
        );
    }

    #[test]
    fn test_apply_order_ignores_broken_order() {
        let photos = vec![PathBuf::from("a.jpg"), PathBuf::from("b.jpg")];
        assert_eq!(apply_order(photos.clone(), &[1]), photos);
        assert_eq!(apply_order(photos.clone(), &[1, 1]), photos);
        assert_eq!(apply_order(photos.clone(), &[0, 5]), photos);
    }

    #[test]
    fn test_limit_selection_keeps_small_lists() {
        let photos = vec![PathBuf::from("a.jpg"), PathBuf::from("b.jpg")];
        assert_eq!(limit_selection(photos.clone()), photos);
    }
}
