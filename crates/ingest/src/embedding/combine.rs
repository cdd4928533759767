//! Fusing page image vectors into chunk text vectors.
//!
//! A combined vector is `text ++ image`, where the image part is the
//! normalised mean of every image vector on the chunk's page (zeros when the
//! page has none). Every stored vector therefore has the same length, and
//! query vectors are padded with zeros to match.

/// Scale to unit length. Zero vectors are returned unchanged.
pub fn l2_normalize(mut v: Vec<f32>) -> Vec<f32> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        v.iter_mut().for_each(|x| *x /= norm);
    }
    v
}

/// Element-wise mean of equally sized vectors. `None` for an empty input.
pub fn mean_vector(vectors: &[Vec<f32>]) -> Option<Vec<f32>> {
    let first = vectors.first()?;
    let mut sum = vec![0.0f32; first.len()];
    for v in vectors {
        for (acc, x) in sum.iter_mut().zip(v) {
            *acc += x;
        }
    }
    let n = vectors.len() as f32;
    sum.iter_mut().for_each(|x| *x /= n);
    Some(sum)
}

/// Append the page's image signal to a chunk's text vector.
pub fn combine_embeddings(text: &[f32], image_vectors: &[Vec<f32>], image_dims: usize) -> Vec<f32> {
    let mut combined = Vec::with_capacity(text.len() + image_dims);
    combined.extend_from_slice(text);
    match mean_vector(image_vectors) {
        Some(mean) => {
            let mut image = l2_normalize(mean);
            image.resize(image_dims, 0.0);
            combined.extend(image);
        }
        None => combined.resize(text.len() + image_dims, 0.0),
    }
    combined
}

/// Zero-pad a query vector to the combined length.
pub fn pad_query_embedding(mut query: Vec<f32>, image_dims: usize) -> Vec<f32> {
    query.resize(query.len() + image_dims, 0.0);
    query
}
