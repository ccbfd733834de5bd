//! Indonesian prompt text per report type

use crate::types::DatasetKind;

/// Preset prompt text for the narrative report
pub struct PromptTemplates;

impl PromptTemplates {
    pub fn role() -> &'static str {
        "Anda adalah seorang analis data universitas yang ahli. Tugas Anda adalah membuat \
laporan naratif yang profesional dan mudah dipahami berdasarkan data yang diberikan."
    }

    /// Grounding rules; every line here is mandatory
    pub fn rules() -> Vec<&'static str> {
        vec![
            "Hanya gunakan angka yang tercantum pada bagian DATA. Jangan mengarang angka, \
persentase, tren, atau perbandingan yang tidak ada dalam data.",
            "Tulis setiap angka persis seperti tertulis pada DATA, dengan presisi dan satuan yang sama.",
            "Sebutkan nama metrik tepat sebelum angkanya, misalnya \"rata-rata nilai 3.55\".",
            "Jangan menambahkan konteks dari luar data seperti survei, periode sebelumnya, \
atau statistik nasional.",
            "Jika suatu hal tidak dapat disimpulkan dari data, lewati saja tanpa berspekulasi.",
        ]
    }

    /// Report structure guidance for the dataset kind
    pub fn structure(kind: DatasetKind) -> &'static str {
        match kind {
            DatasetKind::Student => {
                "Buatlah laporan analisis performa mahasiswa dengan struktur berikut:\n\
## Ringkasan Eksekutif\n\
- Gambaran umum data mahasiswa dan temuan utama\n\
## Analisis Detail\n\
- Distribusi nilai atau IPK\n\
- Pola yang terlihat langsung dari data\n\
## Kesimpulan dan Rekomendasi\n\
- Kesimpulan berdasarkan data\n\
- Rekomendasi untuk perbaikan\n\
Gunakan format Markdown dengan heading, bullet points, dan penekanan yang sesuai."
            }
            DatasetKind::Finance => {
                "Buatlah laporan analisis keuangan dengan struktur berikut:\n\
## Ringkasan Keuangan\n\
- Gambaran kondisi keuangan dan angka-angka penting\n\
## Analisis Mendalam\n\
- Rincian per kategori\n\
- Pendapatan dan pengeluaran\n\
## Kesimpulan dan Saran\n\
- Kesimpulan finansial\n\
- Rekomendasi strategis\n\
Gunakan format Markdown. Tulis nominal rupiah dengan awalan Rp."
            }
            DatasetKind::Unknown => {
                "Buatlah laporan analisis data dengan struktur:\n\
## Ringkasan\n\
## Analisis Detail\n\
## Kesimpulan\n\
Gunakan format Markdown."
            }
        }
    }

    pub fn closing() -> &'static str {
        "Mulai menulis laporan sekarang dalam Bahasa Indonesia:"
    }
}
