//! 证书编号生成
//!
//! 编号格式为 `<10 位随机数字><名首字母><父姓首字母>`，例如 `6606202546RH`。

use rand::Rng;

const ID_MIN: u64 = 1_000_000_000;
const ID_MAX: u64 = 9_999_999_999;

/// 使用线程本地随机数生成器生成证书编号
pub fn generate_certificate_id(first_name: &str, paternal_last_name: &str) -> String {
    generate_certificate_id_with(&mut rand::rng(), first_name, paternal_last_name)
}

/// 使用指定的随机数生成器生成证书编号（便于测试）
pub fn generate_certificate_id_with<R: Rng + ?Sized>(
    rng: &mut R,
    first_name: &str,
    paternal_last_name: &str,
) -> String {
    let digits: u64 = rng.random_range(ID_MIN..=ID_MAX);
    format!(
        "{}{}{}",
        digits,
        initial(first_name),
        initial(paternal_last_name)
    )
}

// 空字符串不产生首字母
fn initial(name: &str) -> String {
    name.trim()
        .chars()
        .next()
        .map(|c| c.to_uppercase().collect())
        .unwrap_or_default()
}
