// decision_core/src/report/lint.rs

use crate::data_models::request::Locale;

const SUPERLATIVES: [&str; 8] = [
    "amazing",
    "incredible",
    "unbelievable",
    "revolutionary",
    "game-changing",
    "mind-blowing",
    "world-class",
    "jaw-dropping",
];

const GENERIC_TRUST_VERDICTS: [&str; 4] = [
    "lacks trust signals",
    "no trust signals",
    "missing trust signals",
    "untrustworthy",
];

const ROI_PROMISES: [&str; 4] = [
    "guaranteed roi",
    "guaranteed uplift",
    "guaranteed increase",
    "we guarantee your revenue",
];

/// Section headings per locale, in report order. These are also the lint's
/// locale check: generated prose must carry most of them.
pub fn section_headings(locale: Locale) -> [&'static str; 7] {
    match locale {
        Locale::En => [
            "Executive Decision Summary",
            "Context Snapshot",
            "Decision Failure Breakdown",
            "What to Fix First",
            "Actionable Recommendations",
            "What This Will Improve",
            "Next Diagnostic Step",
        ],
        Locale::Fa => [
            "خلاصه تصمیم مدیریتی",
            "تصویر زمینه",
            "تحلیل شکست تصمیم",
            "اولین اصلاح",
            "توصیه‌های عملی",
            "چه چیزی بهبود می‌یابد",
            "گام تشخیصی بعدی",
        ],
        Locale::Tr => [
            "Yönetici Karar Özeti",
            "Bağlam Görünümü",
            "Karar Engeli Analizi",
            "Önce Ne Düzeltilmeli",
            "Uygulanabilir Öneriler",
            "Neyi İyileştirecek",
            "Sonraki Tanı Adımı",
        ],
    }
}

/// # NDOC
/// component: `report::lint`
/// purpose: Pre-emit checks on generated prose. A failed check discards the
///          prose and falls back to the deterministic template.
/// invariants:
///   - Enterprise-aware mode rejects generic trust verdicts outright.
///   - Never mutates the prose; reject-only.
pub fn check_prose(prose: &str, locale: Locale, enterprise_aware: bool) -> Result<(), String> {
    let lower = prose.to_lowercase();

    for word in SUPERLATIVES {
        if lower.contains(word) {
            return Err(format!("marketing superlative '{}'", word));
        }
    }

    if enterprise_aware {
        for phrase in GENERIC_TRUST_VERDICTS {
            if lower.contains(phrase) {
                return Err(format!("generic trust verdict '{}'", phrase));
            }
        }
    }

    for phrase in ROI_PROMISES {
        if lower.contains(phrase) {
            return Err(format!("absolute ROI promise '{}'", phrase));
        }
    }

    let headings = section_headings(locale);
    let present = headings.iter().filter(|h| prose.contains(*h)).count();
    if present < 5 {
        return Err(format!(
            "prose carries only {} of 7 locale section headings",
            present
        ));
    }

    Ok(())
}
