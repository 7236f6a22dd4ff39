//! BM25 relevance for prefix matches.

const BM25_K1: f64 = 1.2;
const BM25_B: f64 = 0.75;

/// Corpus statistics for one association's index entries.
#[derive(Debug, Clone, Copy)]
pub struct Corpus {
    pub total_docs: usize,
    pub avg_doc_len: f64,
}

impl Corpus {
    /// From the entry count and the summed token counts of those entries.
    pub fn from_totals(docs: u64, tokens: u64) -> Self {
        let avg_doc_len = if docs == 0 {
            0.0
        } else {
            tokens as f64 / docs as f64
        };
        Self {
            total_docs: docs as usize,
            avg_doc_len,
        }
    }
}

/// Score of one document for a query unit that matched it `tf` times.
///
/// `matching_docs` is the number of documents the unit matched, used
/// for the inverse document frequency.
pub fn bm25(tf: u32, doc_len: u64, matching_docs: usize, corpus: Corpus) -> f64 {
    if tf == 0 || doc_len == 0 || corpus.total_docs == 0 {
        return 0.0;
    }
    let n = corpus.total_docs as f64;
    let df = matching_docs as f64;
    let idf = ((n - df + 0.5) / (df + 0.5)).ln_1p().max(0.0);
    let tf = f64::from(tf);
    let length_norm =
        BM25_B.mul_add(doc_len as f64 / corpus.avg_doc_len.max(1.0), 1.0 - BM25_B);
    idf * (tf * (BM25_K1 + 1.0)) / BM25_K1.mul_add(length_norm, tf)
}
